//! # Titvo CLI Files 共有型定義
//!
//! CLIファイルアップロード用の署名付きURL発行で使用するデータ構造。
//!
//! ## 命名規則
//! - ワイヤ形式（HTTPボディ、DynamoDB属性）: snake_case
//! - ドメイン型: Rustのフィールド名をそのまま使用

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ドメイン型
// ---------------------------------------------------------------------------

/// アップロード対象のファイル。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliFile {
    /// ファイル名。ストレージキーと結果マップのキーにそのまま使われる。
    pub name: String,
    /// ファイルのMIMEタイプ
    pub content_type: String,
}

/// バッチ単位の署名付きURL発行リクエスト。
/// 1回の呼び出しで生成され、レスポンス後に破棄される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCliFilesInput {
    /// APIキー（ヘッダー未指定の場合はNone）
    pub api_key: Option<String>,
    /// バッチ識別子。ストレージキーのパスセグメントになる。
    pub batch_id: String,
    /// 呼び出し元クライアントを示すタグ（検証しない）
    pub source: String,
    /// 対象ファイル一覧
    pub files: Vec<CliFile>,
}

/// 署名付きURL発行結果。
/// そのままHTTPレスポンスボディとしてシリアライズされる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCliFilesOutput {
    /// 処理結果メッセージ
    pub message: String,
    /// ファイル名 → 署名付きアップロードURL
    pub presigned_urls: BTreeMap<String, String>,
}

/// 発行済みアップロード枠の台帳エントリ。
/// 外部のクリーンアップ処理が `tti` 以降に削除する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCliFile {
    /// 生成されたファイルID（UUID v4）
    pub file_id: String,
    /// バッチ識別子
    pub batch_id: String,
    /// ストレージキー（`temp/{batch_id}/{name}`）
    pub file_key: String,
    /// 失効時刻（UNIXエポックからのミリ秒）
    pub tti: u64,
}

// ---------------------------------------------------------------------------
// POST /cli-files ワイヤ形式
// ---------------------------------------------------------------------------

/// POST /cli-files リクエストボディ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliFilesRequestBody {
    /// 呼び出し元タグ
    #[serde(default)]
    pub source: String,
    /// 引数
    pub args: CliFilesArgs,
}

/// POST /cli-files リクエストの `args` 部分。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliFilesArgs {
    /// バッチ識別子
    pub batch_id: String,
    /// 対象ファイル一覧
    pub files: Vec<CliFile>,
}

impl CliFilesRequestBody {
    /// ヘッダーから取り出したAPIキーと合わせてドメイン入力に変換する。
    pub fn into_input(self, api_key: Option<String>) -> TaskCliFilesInput {
        TaskCliFilesInput {
            api_key,
            batch_id: self.args.batch_id,
            source: self.source,
            files: self.args.files,
        }
    }
}

/// エラーレスポンスボディ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// エラーメッセージ
    pub message: String,
}
