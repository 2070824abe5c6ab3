//! # Titvo CLI Files サーバー
//!
//! 設定を読み込み、各コンポーネントを構築してHTTPサーバーを起動する。

use std::sync::Arc;

use titvo_cli_files::auth::{ApiKeyAuthorizer, DynamoApiKeyRepository};
use titvo_cli_files::config::{AppState, Config};
use titvo_cli_files::ledger::DynamoTaskCliFilesLedger;
use titvo_cli_files::parameter::{CachingParameterService, DynamoParameterService};
use titvo_cli_files::service::TaskCliFilesService;
use titvo_cli_files::storage::S3UploadUrlSigner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let max_level: tracing::Level = config.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(max_level).init();

    tracing::info!(
        aws_stage = %config.aws_stage,
        aws_region = %config.aws_region,
        task_cli_files_table = %config.task_cli_files_table_name,
        api_key_table = %config.api_key_table_name,
        config_table = %config.config_table_name,
        ttl_days = config.ttl_days.get(),
        "設定を読み込みました"
    );

    // AWSクライアント
    let sdk_config = titvo_cli_files::aws::load_sdk_config(&config).await;
    let dynamo = titvo_cli_files::aws::dynamo_client(&sdk_config);
    let ledger_dynamo = titvo_cli_files::aws::dynamo_client_without_retry(&sdk_config);

    let parameters = CachingParameterService::new(Box::new(DynamoParameterService::new(
        dynamo.clone(),
        config.config_table_name.clone(),
    )));
    let authorizer = ApiKeyAuthorizer::new(Box::new(DynamoApiKeyRepository::new(
        dynamo,
        config.api_key_table_name.clone(),
    )));
    let signer = S3UploadUrlSigner::from_config(&config)?;
    let ledger = DynamoTaskCliFilesLedger::new(
        ledger_dynamo,
        config.task_cli_files_table_name.clone(),
        config.ledger_retry_policy(),
    );

    let service = TaskCliFilesService::new(
        Box::new(parameters),
        Box::new(authorizer),
        Box::new(signer),
        Box::new(ledger),
    )
    .with_ttl_secs(config.ttl_secs());

    let state = Arc::new(AppState {
        service,
        expose_error_details: config.is_debug(),
    });

    let app = titvo_cli_files::router(state);

    tracing::info!("CLI Filesサーバーを {} で起動します", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
