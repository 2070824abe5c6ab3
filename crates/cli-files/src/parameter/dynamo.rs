//! # DynamoDB パラメータ取得実装

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;

use super::ParameterService;
use crate::error::CliFilesError;

/// パラメータテーブル（パーティションキー `parameter_id`、値 `value`）を参照する実装。
pub struct DynamoParameterService {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoParameterService {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait::async_trait]
impl ParameterService for DynamoParameterService {
    async fn get(&self, key: &str) -> Result<String, CliFilesError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("parameter_id", AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| {
                CliFilesError::Parameter(format!(
                    "パラメータ '{key}' の取得に失敗: {}",
                    DisplayErrorContext(e)
                ))
            })?;

        output
            .item()
            .and_then(|item| item.get("value"))
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| CliFilesError::Parameter(format!("パラメータ '{key}' が存在しません")))
    }
}
