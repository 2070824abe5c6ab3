//! # CLI Files エラー型
//!
//! コア処理は受け取ったエラーをそのまま伝播し、HTTP境界でのみステータスに変換する。

use axum::http::StatusCode;
use axum::Json;
use titvo_types::ErrorBody;

/// 本番相当の環境で内部エラーの代わりに返すメッセージ
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// CLI Filesエラー型。
#[derive(Debug, thiserror::Error)]
pub enum CliFilesError {
    /// APIキーが未指定、またはストアに存在しない
    #[error("APIキーが見つかりません: {0}")]
    ApiKeyNotFound(String),
    /// APIキーは存在するがこの操作の権限がない
    #[error("APIキーにこの操作の権限がありません: {0}")]
    NoAuthorizedApiKey(String),
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// 署名付きURLの生成に失敗
    #[error("署名付きURLの生成に失敗: {0}")]
    Signing(String),
    /// 台帳への書き込みに失敗（リトライ後）
    #[error("台帳への書き込みに失敗: {0}")]
    LedgerWrite(String),
    /// パラメータ取得に失敗
    #[error("パラメータ取得に失敗: {0}")]
    Parameter(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl CliFilesError {
    /// エラー種別に対応するHTTPステータス。
    pub fn status(&self) -> StatusCode {
        match self {
            CliFilesError::ApiKeyNotFound(_) | CliFilesError::NoAuthorizedApiKey(_) => {
                StatusCode::UNAUTHORIZED
            }
            CliFilesError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CliFilesError::Signing(_)
            | CliFilesError::LedgerWrite(_)
            | CliFilesError::Parameter(_)
            | CliFilesError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// HTTP境界で返すエラー。
///
/// `expose_details` が false の場合、500系のメッセージは
/// [`INTERNAL_ERROR_MESSAGE`] に置き換える。
#[derive(Debug)]
pub struct ApiError {
    /// 元のエラー
    pub error: CliFilesError,
    /// 内部エラーの詳細をレスポンスに含めるか
    pub expose_details: bool,
}

impl ApiError {
    pub fn new(error: CliFilesError, expose_details: bool) -> Self {
        Self {
            error,
            expose_details,
        }
    }

    fn message(&self) -> String {
        if self.error.status().is_server_error() && !self.expose_details {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.error.to_string()
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.error.status();
        let body = ErrorBody {
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
