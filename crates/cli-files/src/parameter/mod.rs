//! # パラメータ取得
//!
//! 実行時パラメータ（アップロード先バケット名など）をキーで取得する。
//! DynamoDB実装は `dynamo` サブモジュールを参照。

#[cfg(feature = "vendor-aws")]
pub mod dynamo;

#[cfg(feature = "vendor-aws")]
pub use dynamo::DynamoParameterService;

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::CliFilesError;

/// アップロード先バケット名のパラメータキー
pub const CLI_FILES_BUCKET_PARAMETER: &str = "cli-files-bucket-name";

/// パラメータ取得の抽象インターフェース。
#[async_trait::async_trait]
pub trait ParameterService: Send + Sync {
    /// `key` の値を返す。キーが存在しなければ [`CliFilesError::Parameter`]。
    async fn get(&self, key: &str) -> Result<String, CliFilesError>;
}

/// 取得済みの値をプロセス内に保持するラッパー。
/// 失敗した取得結果は保持しない。
pub struct CachingParameterService {
    inner: Box<dyn ParameterService>,
    cache: RwLock<HashMap<String, String>>,
}

impl CachingParameterService {
    pub fn new(inner: Box<dyn ParameterService>) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl ParameterService for CachingParameterService {
    async fn get(&self, key: &str) -> Result<String, CliFilesError> {
        if let Some(value) = self.cache.read().await.get(key) {
            return Ok(value.clone());
        }

        let value = self.inner.get(key).await?;
        self.cache
            .write()
            .await
            .insert(key.to_string(), value.clone());
        tracing::debug!(parameter = %key, "パラメータをキャッシュしました");
        Ok(value)
    }
}

/// 固定値を返す実装。
pub struct StaticParameterService {
    values: HashMap<String, String>,
}

impl StaticParameterService {
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl ParameterService for StaticParameterService {
    async fn get(&self, key: &str) -> Result<String, CliFilesError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| CliFilesError::Parameter(format!("パラメータ '{key}' が存在しません")))
    }
}
