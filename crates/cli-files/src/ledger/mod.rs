//! # タスクファイル台帳
//!
//! 発行したアップロード枠ごとに1件のエントリを記録する。
//! 一時的な失敗は [`RetryPolicy`] に従ってリトライし、
//! リトライが尽きた場合は [`CliFilesError::LedgerWrite`] を返す。
//! DynamoDB実装は `dynamo` サブモジュールを参照。

#[cfg(feature = "vendor-aws")]
pub mod dynamo;

#[cfg(feature = "vendor-aws")]
pub use dynamo::DynamoTaskCliFilesLedger;

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use titvo_types::TaskCliFile;

use crate::error::CliFilesError;

/// 台帳への書き込みインターフェース。
/// エントリは追記のみで、失効・削除は外部の処理が行う。
#[async_trait::async_trait]
pub trait TaskCliFilesLedger: Send + Sync {
    /// エントリを永続化する。成功時は `file_id` で参照可能になる。
    async fn record(&self, entry: &TaskCliFile) -> Result<(), CliFilesError>;
}

/// 有限回リトライのポリシー。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 初回を含む最大試行回数（1以上）
    pub max_attempts: u32,
    /// 初回リトライ前の待機時間。以降は試行ごとに倍になる。
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// `attempt` 回目の失敗後に待機する時間
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// `op` を実行し、`is_transient` が真を返すエラーの間だけリトライする。
/// 一時的でないエラー、または最終試行のエラーはそのまま返す。
pub async fn retry_transient<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut op: F,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_transient(&e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "一時的なエラーのためリトライします"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
