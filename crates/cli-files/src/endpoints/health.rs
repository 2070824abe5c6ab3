//! # GET /health
//!
//! ロードバランサーからの死活監視用。

use axum::Json;

/// GET /health: 常に `{"status": "ok"}` を返す。
pub async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
