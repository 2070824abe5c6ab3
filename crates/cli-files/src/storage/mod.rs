//! # アップロード用署名付きURL発行
//!
//! オブジェクトストレージへの書き込み専用URLを発行する抽象インターフェース。
//! S3互換ストレージ実装は `s3` サブモジュールを参照。

#[cfg(feature = "vendor-aws")]
pub mod s3;

#[cfg(feature = "vendor-aws")]
pub use s3::S3UploadUrlSigner;

use crate::error::CliFilesError;

/// 署名付きアップロードURLの発行者。
///
/// 発行されたURLは `expiry_secs` 秒間、`path` への1回のPUT
/// （`content_type` 一致）のみを許可する。読み取り権限は含まない。
/// 署名はローカルで行われ、ネットワーク書き込みは発生しない。
#[async_trait::async_trait]
pub trait UploadUrlSigner: Send + Sync {
    /// `container` 内の `path` へのアップロードURLを発行する。
    /// 失敗時は [`CliFilesError::Signing`] を返し、リトライしない。
    async fn presign_upload(
        &self,
        container: &str,
        path: &str,
        content_type: &str,
        expiry_secs: u32,
    ) -> Result<String, CliFilesError>;
}

/// 呼び出し側の事前条件を検証する。
pub(crate) fn check_presign_args(
    container: &str,
    path: &str,
    expiry_secs: u32,
) -> Result<(), CliFilesError> {
    if container.is_empty() {
        return Err(CliFilesError::Signing("コンテナ名が空です".to_string()));
    }
    if path.is_empty() {
        return Err(CliFilesError::Signing("オブジェクトパスが空です".to_string()));
    }
    if expiry_secs == 0 {
        return Err(CliFilesError::Signing(
            "有効期限は1秒以上である必要があります".to_string(),
        ));
    }
    Ok(())
}
