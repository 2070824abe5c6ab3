//! # DynamoDB APIキーストア実装

use std::collections::HashMap;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;

use super::{ApiKeyRecord, ApiKeyRepository};
use crate::error::CliFilesError;

/// APIキーテーブル（パーティションキー `api_key_id`）を参照する実装。
pub struct DynamoApiKeyRepository {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoApiKeyRepository {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

/// DynamoDBアイテムをレコードに変換する。
/// `scopes` は文字列セット(SS)と文字列リスト(L)のどちらも受け付ける。
fn record_from_item(item: &HashMap<String, AttributeValue>) -> Result<ApiKeyRecord, CliFilesError> {
    let string_attr = |name: &str| -> Result<String, CliFilesError> {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| CliFilesError::Internal(format!("APIキーレコードに {name} がありません")))
    };

    let scopes = match item.get("scopes") {
        Some(AttributeValue::Ss(values)) => values.clone(),
        Some(AttributeValue::L(values)) => values
            .iter()
            .filter_map(|v| v.as_s().ok().cloned())
            .collect(),
        _ => Vec::new(),
    };

    Ok(ApiKeyRecord {
        api_key_id: string_attr("api_key_id")?,
        user_id: string_attr("user_id")?,
        scopes,
    })
}

#[async_trait::async_trait]
impl ApiKeyRepository for DynamoApiKeyRepository {
    async fn find_by_id(&self, api_key_id: &str) -> Result<Option<ApiKeyRecord>, CliFilesError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("api_key_id", AttributeValue::S(api_key_id.to_string()))
            .send()
            .await
            .map_err(|e| {
                CliFilesError::Internal(format!(
                    "APIキーの取得に失敗: {}",
                    DisplayErrorContext(e)
                ))
            })?;

        output.item().map(record_from_item).transpose()
    }
}
