//! # DynamoDB タスクファイル台帳実装

use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use titvo_types::TaskCliFile;

use super::{retry_transient, RetryPolicy, TaskCliFilesLedger};
use crate::error::CliFilesError;

/// DynamoDBテーブルに台帳エントリを書き込む実装。
///
/// 属性: `file_id`(S), `batch_id`(S), `file_key`(S), `tti`(N, エポックミリ秒)
pub struct DynamoTaskCliFilesLedger {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
    retry: RetryPolicy,
}

impl DynamoTaskCliFilesLedger {
    /// `client` はSDKリトライを無効にしたものを渡す
    /// （[`crate::aws::dynamo_client_without_retry`]）。
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            table_name,
            retry,
        }
    }

    async fn put_item(
        &self,
        entry: &TaskCliFile,
    ) -> Result<(), DisplayErrorContext<SdkError<PutItemError>>> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("file_id", AttributeValue::S(entry.file_id.clone()))
            .item("batch_id", AttributeValue::S(entry.batch_id.clone()))
            .item("file_key", AttributeValue::S(entry.file_key.clone()))
            .item("tti", AttributeValue::N(entry.tti.to_string()))
            .send()
            .await
            .map(|_| ())
            .map_err(DisplayErrorContext)
    }
}

/// リトライで回復しうるエラーか判定する。
/// 通信失敗・タイムアウト・スロットリング・サーバー側エラーを対象とする。
fn is_transient<R>(err: &SdkError<PutItemError, R>) -> bool {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(service_err) => matches!(
            service_err.err(),
            PutItemError::ProvisionedThroughputExceededException(_)
                | PutItemError::RequestLimitExceeded(_)
                | PutItemError::InternalServerError(_)
        ),
        _ => false,
    }
}

#[async_trait::async_trait]
impl TaskCliFilesLedger for DynamoTaskCliFilesLedger {
    async fn record(&self, entry: &TaskCliFile) -> Result<(), CliFilesError> {
        retry_transient(
            &self.retry,
            move || self.put_item(entry),
            |e| is_transient(&e.0),
        )
        .await
        .map_err(|e| {
            tracing::error!(
                file_id = %entry.file_id,
                file_key = %entry.file_key,
                error = %e,
                "台帳への書き込みに失敗しました"
            );
            CliFilesError::LedgerWrite(e.to_string())
        })?;

        tracing::debug!(
            file_id = %entry.file_id,
            batch_id = %entry.batch_id,
            file_key = %entry.file_key,
            "台帳エントリを記録しました"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::error::{
        ConditionalCheckFailedException, ProvisionedThroughputExceededException,
    };

    use super::*;

    fn service_error(err: PutItemError) -> SdkError<PutItemError, ()> {
        SdkError::service_error(err, ())
    }

    #[test]
    fn test_timeout_is_transient() {
        let err: SdkError<PutItemError, ()> = SdkError::timeout_error("タイムアウト");
        assert!(is_transient(&err));
    }

    /// リクエスト構築の失敗はリトライしても回復しない
    #[test]
    fn test_construction_failure_is_not_transient() {
        let err: SdkError<PutItemError, ()> = SdkError::construction_failure("構築失敗");
        assert!(!is_transient(&err));
    }

    #[test]
    fn test_throughput_exceeded_is_transient() {
        let err = service_error(PutItemError::ProvisionedThroughputExceededException(
            ProvisionedThroughputExceededException::builder()
                .message("throughput exceeded")
                .build(),
        ));
        assert!(is_transient(&err));
    }

    #[test]
    fn test_conditional_check_failed_is_not_transient() {
        let err = service_error(PutItemError::ConditionalCheckFailedException(
            ConditionalCheckFailedException::builder()
                .message("condition failed")
                .build(),
        ));
        assert!(!is_transient(&err));
    }
}
