//! # Titvo CLI Files
//!
//! CLIからアップロードされるファイル用に、書き込み専用の署名付きURLを発行し、
//! 発行ごとの台帳エントリを記録するサービス。
//!
//! ## 役割
//! - APIキーによる認可
//! - 一時アップロード領域（`temp/{batch_id}/{name}`）への署名付きURL発行
//! - 失効時刻付きの台帳エントリ記録（失効後の削除は外部処理）
//!
//! ## API エンドポイント
//! - `POST /cli-files`: 署名付きURL発行
//! - `GET /health`: 死活監視

pub mod auth;
#[cfg(feature = "vendor-aws")]
pub mod aws;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod ledger;
pub mod parameter;
pub mod service;
pub mod storage;

use std::sync::Arc;

use crate::config::AppState;

/// axumルーターを構築する。
pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route(
            "/cli-files",
            axum::routing::post(endpoints::handle_cli_files),
        )
        .route("/health", axum::routing::get(endpoints::handle_health))
        .with_state(state)
}
