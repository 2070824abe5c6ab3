//! # APIキー認可
//!
//! `x-api-key` ヘッダーで渡されたAPIキーを検証する。
//! キーはSHA-256ハッシュ（16進）としてストアに保存されており、
//! 平文のキーは保存もログ出力もしない。
//! DynamoDB実装は `dynamo` サブモジュールを参照。

#[cfg(feature = "vendor-aws")]
pub mod dynamo;

#[cfg(feature = "vendor-aws")]
pub use dynamo::DynamoApiKeyRepository;

use sha2::{Digest, Sha256};

use crate::error::CliFilesError;

/// CLIファイルのアップロードURL発行に必要なスコープ
pub const CLI_FILES_SCOPE: &str = "cli-files";

/// ストアに保存されたAPIキーのレコード。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyRecord {
    /// APIキーのSHA-256ハッシュ（16進）
    pub api_key_id: String,
    /// キーの所有ユーザー
    pub user_id: String,
    /// 許可された操作
    pub scopes: Vec<String>,
}

/// 認可済みの呼び出し元。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedApiKey {
    pub api_key_id: String,
    pub user_id: String,
}

/// APIキーストアの抽象インターフェース。
#[async_trait::async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// ハッシュ値でレコードを検索する。存在しなければ `None`。
    async fn find_by_id(&self, api_key_id: &str) -> Result<Option<ApiKeyRecord>, CliFilesError>;
}

/// APIキー認可の抽象インターフェース。
#[async_trait::async_trait]
pub trait Authorizer: Send + Sync {
    /// キーを検証する。
    ///
    /// - キーが未指定・空・ストアに存在しない: [`CliFilesError::ApiKeyNotFound`]
    /// - キーは存在するが権限がない: [`CliFilesError::NoAuthorizedApiKey`]
    async fn validate(&self, api_key: Option<&str>) -> Result<AuthorizedApiKey, CliFilesError>;
}

/// APIキーのハッシュ値（ストアのキー）を計算する。
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

/// ストアを参照し、スコープで権限を判定する認可実装。
pub struct ApiKeyAuthorizer {
    repository: Box<dyn ApiKeyRepository>,
    required_scope: String,
}

impl ApiKeyAuthorizer {
    pub fn new(repository: Box<dyn ApiKeyRepository>) -> Self {
        Self::with_scope(repository, CLI_FILES_SCOPE)
    }

    pub fn with_scope(repository: Box<dyn ApiKeyRepository>, required_scope: &str) -> Self {
        Self {
            repository,
            required_scope: required_scope.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Authorizer for ApiKeyAuthorizer {
    async fn validate(&self, api_key: Option<&str>) -> Result<AuthorizedApiKey, CliFilesError> {
        let api_key = match api_key.map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(CliFilesError::ApiKeyNotFound(
                    "x-api-keyヘッダーが指定されていません".to_string(),
                ))
            }
        };

        let api_key_id = hash_api_key(api_key);
        let record = self
            .repository
            .find_by_id(&api_key_id)
            .await?
            .ok_or_else(|| CliFilesError::ApiKeyNotFound("未登録のAPIキーです".to_string()))?;

        if !record.scopes.iter().any(|s| s == &self.required_scope) {
            tracing::warn!(
                user_id = %record.user_id,
                required_scope = %self.required_scope,
                "APIキーに必要なスコープがありません"
            );
            return Err(CliFilesError::NoAuthorizedApiKey(format!(
                "スコープ '{}' が許可されていません",
                self.required_scope
            )));
        }

        Ok(AuthorizedApiKey {
            api_key_id: record.api_key_id,
            user_id: record.user_id,
        })
    }
}
