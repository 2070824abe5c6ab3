//! # POST /cli-files
//!
//! CLIからのファイルアップロード用署名付きURL発行。
//!
//! - APIキーは `x-api-key` ヘッダー（大文字小文字を区別しない）
//! - ボディ: `{"source": ..., "args": {"batch_id": ..., "files": [{"name", "content_type"}]}}`

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use titvo_types::{CliFilesRequestBody, TaskCliFilesOutput};

use crate::config::AppState;
use crate::error::{ApiError, CliFilesError};

/// APIキーを受け取るヘッダー名
pub const API_KEY_HEADER: &str = "x-api-key";

/// POST /cli-files: 署名付きURL発行。
pub async fn handle_cli_files(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TaskCliFilesOutput>, ApiError> {
    tracing::debug!("リクエストを受信しました");

    let reject = |error: CliFilesError| {
        tracing::error!(error = %error, status = %error.status(), "リクエストの処理に失敗しました");
        ApiError::new(error, state.expose_error_details)
    };

    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let request: CliFilesRequestBody = serde_json::from_slice(&body)
        .map_err(|e| reject(CliFilesError::BadRequest(format!("ボディのパースに失敗: {e}"))))?;

    let output = state
        .service
        .process(request.into_input(api_key))
        .await
        .map_err(reject)?;

    Ok(Json(output))
}
