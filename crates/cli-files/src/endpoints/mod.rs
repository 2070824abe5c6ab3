//! # CLI Files エンドポイント

pub mod cli_files;
pub mod health;

pub use cli_files::handle_cli_files;
pub use health::handle_health;
