//! # S3互換 署名付きURL発行実装
//!
//! AWS S3およびLocalStack等のS3互換APIに対する署名付きPUT URLを生成する。

use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use super::{check_presign_args, UploadUrlSigner};
use crate::config::Config;
use crate::error::CliFilesError;

/// S3互換ストレージによる署名付きURL発行実装。
///
/// バケット名はリクエストごとにパラメータから解決されるため、
/// リージョンと認証情報だけを保持し、署名時にバケットを構築する。
pub struct S3UploadUrlSigner {
    region: s3::Region,
    credentials: s3::creds::Credentials,
    /// LocalStack等のカスタムエンドポイントではパススタイルを使う
    path_style: bool,
}

impl S3UploadUrlSigner {
    pub fn new(region: s3::Region, credentials: s3::creds::Credentials, path_style: bool) -> Self {
        Self {
            region,
            credentials,
            path_style,
        }
    }

    /// 設定から構築する。
    ///
    /// `localstack` ステージでは `AWS_ENDPOINT` をパススタイルで使用し、
    /// 認証情報が見つからなければ `test`/`test` を使う。
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if config.is_localstack() {
            let region = s3::Region::Custom {
                region: config.aws_region.clone(),
                endpoint: config.aws_endpoint.clone(),
            };
            let credentials = match s3::creds::Credentials::default() {
                Ok(credentials) => credentials,
                Err(e) => {
                    tracing::warn!(error = %e, "認証情報が見つかりません。LocalStack用の認証情報を使用します");
                    s3::creds::Credentials::new(Some("test"), Some("test"), None, None, None)?
                }
            };
            tracing::info!(aws_endpoint = %config.aws_endpoint, "S3署名にLocalStackエンドポイントを使用");
            return Ok(Self::new(region, credentials, true));
        }

        let region = s3::Region::Custom {
            region: config.aws_region.clone(),
            endpoint: format!("https://s3.{}.amazonaws.com", config.aws_region),
        };
        let credentials = s3::creds::Credentials::default()?;
        Ok(Self::new(region, credentials, false))
    }

    fn bucket(&self, container: &str) -> Result<Box<s3::Bucket>, CliFilesError> {
        let bucket = s3::Bucket::new(container, self.region.clone(), self.credentials.clone())
            .map_err(|e| CliFilesError::Signing(format!("バケットの初期化に失敗: {e}")))?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[async_trait::async_trait]
impl UploadUrlSigner for S3UploadUrlSigner {
    async fn presign_upload(
        &self,
        container: &str,
        path: &str,
        content_type: &str,
        expiry_secs: u32,
    ) -> Result<String, CliFilesError> {
        check_presign_args(container, path, expiry_secs)?;

        // Content-Typeを署名対象ヘッダーに含め、異なるMIMEタイプでのアップロードを拒否させる
        let mut headers = HeaderMap::new();
        let content_type_value = HeaderValue::from_str(content_type).map_err(|e| {
            CliFilesError::Signing(format!("content_type '{content_type}' を署名できません: {e}"))
        })?;
        headers.insert(CONTENT_TYPE, content_type_value);

        self.bucket(container)?
            .presign_put(path, expiry_secs, Some(headers), None)
            .await
            .map_err(|e| CliFilesError::Signing(format!("署名付きアップロードURL生成失敗: {e}")))
    }
}
