//! # CLI Files 設定・共有状態
//!
//! 環境変数からの設定読み込みとHTTPハンドラの共有状態の定義。
//! 設定は起動時に一度だけ構築し、各コンポーネントへ明示的に渡す。

use std::num::NonZeroU32;
use std::time::Duration;

use crate::ledger::RetryPolicy;
use crate::service::{TaskCliFilesService, ONE_DAY_IN_SECONDS};

/// LocalStackを示すステージ名
pub const LOCALSTACK_STAGE: &str = "localstack";

/// サービス全体の設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// デプロイステージ（`localstack` の場合はカスタムエンドポイントを使う）
    pub aws_stage: String,
    /// LocalStack用エンドポイント
    pub aws_endpoint: String,
    /// AWSリージョン
    pub aws_region: String,
    /// 台帳テーブル名
    pub task_cli_files_table_name: String,
    /// APIキーテーブル名
    pub api_key_table_name: String,
    /// パラメータテーブル名
    pub config_table_name: String,
    /// 署名付きURLと台帳エントリの有効日数
    pub ttl_days: NonZeroU32,
    /// 台帳書き込みの最大試行回数
    pub ledger_max_attempts: u32,
    /// 台帳書き込みリトライの基本待機時間
    pub ledger_retry_base_delay: Duration,
    /// ログレベル（`debug` の場合は内部エラーの詳細をレスポンスに含める）
    pub log_level: String,
    /// HTTPサーバーの待ち受けアドレス
    pub bind_addr: String,
}

impl Config {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー検索関数から構築する。
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let aws_stage = lookup("AWS_STAGE").unwrap_or_else(|| "prod".to_string());
        let aws_endpoint =
            lookup("AWS_ENDPOINT").unwrap_or_else(|| "http://localhost:4566".to_string());
        let aws_region = lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string());

        let task_cli_files_table_name = lookup("TASK_CLI_FILES_TABLE_NAME")
            .unwrap_or_else(|| format!("tvo-security-scan-task-cli-files-{aws_stage}"));
        let api_key_table_name = lookup("API_KEY_TABLE_NAME")
            .unwrap_or_else(|| format!("tvo-security-scan-account-apikey-{aws_stage}"));
        let config_table_name = lookup("CONFIG_TABLE_NAME")
            .ok_or_else(|| anyhow::anyhow!("CONFIG_TABLE_NAMEが未設定です"))?;

        let ttl_days = parse_or(&lookup, "CLI_FILES_TTL_DAYS", NonZeroU32::MIN)?;
        let ledger_max_attempts = parse_or(&lookup, "LEDGER_MAX_ATTEMPTS", 3u32)?;
        if ledger_max_attempts == 0 {
            anyhow::bail!("LEDGER_MAX_ATTEMPTSは1以上である必要があります");
        }
        let ledger_retry_base_delay =
            Duration::from_millis(parse_or(&lookup, "LEDGER_RETRY_BASE_DELAY_MS", 100u64)?);

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        Ok(Self {
            aws_stage,
            aws_endpoint,
            aws_region,
            task_cli_files_table_name,
            api_key_table_name,
            config_table_name,
            ttl_days,
            ledger_max_attempts,
            ledger_retry_base_delay,
            log_level,
            bind_addr,
        })
    }

    pub fn is_localstack(&self) -> bool {
        self.aws_stage == LOCALSTACK_STAGE
    }

    /// 内部エラーの詳細をクライアントに返してよいか
    pub fn is_debug(&self) -> bool {
        self.log_level.eq_ignore_ascii_case("debug")
    }

    /// 署名付きURLの有効期限（秒）
    pub fn ttl_secs(&self) -> NonZeroU32 {
        NonZeroU32::new(self.ttl_days.get().saturating_mul(ONE_DAY_IN_SECONDS))
            .unwrap_or(NonZeroU32::MAX)
    }

    pub fn ledger_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.ledger_max_attempts,
            base_delay: self.ledger_retry_base_delay,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}の値 '{raw}' を解釈できません: {e}")),
        None => Ok(default),
    }
}

/// HTTPハンドラの共有状態。
pub struct AppState {
    /// 署名付きURL発行処理
    pub service: TaskCliFilesService,
    /// 内部エラーの詳細をレスポンスに含めるか
    pub expose_error_details: bool,
}
