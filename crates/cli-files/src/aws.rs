//! # AWSクライアント初期化
//!
//! DynamoDBクライアントの構築。`localstack` ステージでは `AWS_ENDPOINT` を使う。

use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;

use crate::config::Config;

/// 共通のSDK設定を読み込む。
pub async fn load_sdk_config(config: &Config) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()));

    if config.is_localstack() {
        tracing::info!(aws_endpoint = %config.aws_endpoint, "LocalStackエンドポイントを使用");
        loader = loader.endpoint_url(&config.aws_endpoint);
    }

    loader.load().await
}

/// SDK標準のリトライを有効にしたDynamoDBクライアント。
pub fn dynamo_client(sdk_config: &aws_config::SdkConfig) -> aws_sdk_dynamodb::Client {
    aws_sdk_dynamodb::Client::new(sdk_config)
}

/// SDKのリトライを無効にしたDynamoDBクライアント。
/// 台帳書き込みは [`crate::ledger::retry_transient`] で自前のポリシーを適用する。
pub fn dynamo_client_without_retry(sdk_config: &aws_config::SdkConfig) -> aws_sdk_dynamodb::Client {
    let conf = aws_sdk_dynamodb::config::Builder::from(sdk_config)
        .retry_config(RetryConfig::disabled())
        .build();
    aws_sdk_dynamodb::Client::from_conf(conf)
}
