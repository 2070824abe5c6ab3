//! # CLIファイル署名付きURL発行処理
//!
//! バッチ内の各ファイルについて、ストレージキーの導出、署名付きURLの発行、
//! 台帳エントリの記録を行い、ファイル名 → URL のマップを返す。
//!
//! ## 処理順序
//! 1. パラメータからアップロード先バケット名を解決
//! 2. APIキーを検証（失敗時は発行・記録を一切行わない）
//! 3. 入力を検証
//! 4. ファイルごとに「URL発行 → 台帳記録」を並行実行
//! 5. 全ファイルの完了を待ってから結果をマージ
//!
//! いずれかのファイルで失敗した場合は呼び出し全体が失敗し、URLは返さない。
//! 他のファイルの処理は中断せず完了まで実行されるため、
//! 成功分の台帳エントリはそのまま残る（ロールバックしない）。

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::time::{SystemTime, UNIX_EPOCH};

use titvo_types::{CliFile, TaskCliFile, TaskCliFilesInput, TaskCliFilesOutput};

use crate::auth::Authorizer;
use crate::error::CliFilesError;
use crate::ledger::TaskCliFilesLedger;
use crate::parameter::{ParameterService, CLI_FILES_BUCKET_PARAMETER};
use crate::storage::UploadUrlSigner;

/// 成功時のレスポンスメッセージ
pub const SUCCESS_MESSAGE: &str = "Files urls generated successfully";

/// デフォルトの有効期限（1日、秒）
pub const ONE_DAY_IN_SECONDS: u32 = 60 * 60 * 24;

/// 一時アップロード領域のストレージキーを導出する。
/// `name` は変換せずそのまま使う。
pub fn file_key(batch_id: &str, name: &str) -> String {
    format!("temp/{batch_id}/{name}")
}

/// 署名付きURL発行処理。
pub struct TaskCliFilesService {
    parameters: Box<dyn ParameterService>,
    authorizer: Box<dyn Authorizer>,
    signer: Box<dyn UploadUrlSigner>,
    ledger: Box<dyn TaskCliFilesLedger>,
    /// 署名付きURLと台帳エントリの有効期限（秒）
    ttl_secs: u32,
}

impl TaskCliFilesService {
    pub fn new(
        parameters: Box<dyn ParameterService>,
        authorizer: Box<dyn Authorizer>,
        signer: Box<dyn UploadUrlSigner>,
        ledger: Box<dyn TaskCliFilesLedger>,
    ) -> Self {
        Self {
            parameters,
            authorizer,
            signer,
            ledger,
            ttl_secs: ONE_DAY_IN_SECONDS,
        }
    }

    /// 有効期限を変更する。
    pub fn with_ttl_secs(mut self, ttl_secs: NonZeroU32) -> Self {
        self.ttl_secs = ttl_secs.get();
        self
    }

    /// バッチ内の全ファイルについて署名付きURLを発行する。
    pub async fn process(
        &self,
        input: TaskCliFilesInput,
    ) -> Result<TaskCliFilesOutput, CliFilesError> {
        let bucket_name = self.parameters.get(CLI_FILES_BUCKET_PARAMETER).await?;

        let authorized = self.authorizer.validate(input.api_key.as_deref()).await?;

        validate_input(&input)?;

        tracing::info!(
            batch_id = %input.batch_id,
            source = %input.source,
            user_id = %authorized.user_id,
            file_count = input.files.len(),
            "署名付きURLを発行します"
        );

        let results = futures::future::join_all(
            input
                .files
                .iter()
                .map(|file| self.issue_file(&bucket_name, &input.batch_id, file)),
        )
        .await;

        // 入力順にマージし、最初のエラーを返す。同名ファイルは後勝ち。
        let mut presigned_urls = BTreeMap::new();
        for result in results {
            let (name, url) = result?;
            presigned_urls.insert(name, url);
        }

        Ok(TaskCliFilesOutput {
            message: SUCCESS_MESSAGE.to_string(),
            presigned_urls,
        })
    }

    /// 1ファイル分のURL発行と台帳記録。台帳記録はURL発行の成功後に行う。
    async fn issue_file(
        &self,
        bucket_name: &str,
        batch_id: &str,
        file: &CliFile,
    ) -> Result<(String, String), CliFilesError> {
        let file_key = file_key(batch_id, &file.name);

        let presigned_url = self
            .signer
            .presign_upload(bucket_name, &file_key, &file.content_type, self.ttl_secs)
            .await?;

        let entry = TaskCliFile {
            file_id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            file_key,
            tti: now_millis()? + u64::from(self.ttl_secs) * 1000,
        };
        self.ledger.record(&entry).await?;

        Ok((file.name.clone(), presigned_url))
    }
}

fn validate_input(input: &TaskCliFilesInput) -> Result<(), CliFilesError> {
    if input.batch_id.is_empty() {
        return Err(CliFilesError::BadRequest(
            "batch_idは空にできません".to_string(),
        ));
    }
    for (index, file) in input.files.iter().enumerate() {
        if file.name.is_empty() {
            return Err(CliFilesError::BadRequest(format!(
                "files[{index}].nameは空にできません"
            )));
        }
        // 署名対象ヘッダーに載せられない値は発行前に弾く
        if let Err(e) = http::HeaderValue::from_str(&file.content_type) {
            return Err(CliFilesError::BadRequest(format!(
                "files[{index}].content_type '{}' は不正です: {e}",
                file.content_type
            )));
        }
    }
    Ok(())
}

fn now_millis() -> Result<u64, CliFilesError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CliFilesError::Internal(format!("時刻取得失敗: {e}")))?;
    Ok(elapsed.as_millis() as u64)
}


#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;

    use super::test_helpers::*;
    use super::*;
    use crate::parameter::StaticParameterService;

    const ONE_DAY_IN_MS: u64 = ONE_DAY_IN_SECONDS as u64 * 1000;

    /// 1ファイルの基本シナリオ
    #[tokio::test]
    async fn test_process_single_file() {
        let h = harness(MockAuthorizer::Allow, None);

        let before = now_millis().unwrap();
        let output = h.service.process(input("b1", &["a.txt"])).await.unwrap();
        let after = now_millis().unwrap();

        assert_eq!(output.message, "Files urls generated successfully");
        assert_eq!(output.presigned_urls.len(), 1);
        assert_eq!(
            output.presigned_urls["a.txt"],
            "http://mock-storage/cli-files-bucket/temp/b1/a.txt?sig=test"
        );

        let entries = h.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_key, "temp/b1/a.txt");
        assert_eq!(entries[0].batch_id, "b1");
        assert!(uuid::Uuid::parse_str(&entries[0].file_id).is_ok());
        assert!(entries[0].tti >= before + ONE_DAY_IN_MS);
        assert!(entries[0].tti <= after + ONE_DAY_IN_MS);

        let requests = h.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            (
                "cli-files-bucket".to_string(),
                "temp/b1/a.txt".to_string(),
                "text/plain".to_string(),
                86400
            )
        );
    }

    /// N件のファイルに対してN件のURLとN件の台帳エントリ
    #[tokio::test]
    async fn test_process_multiple_files() {
        let h = harness(MockAuthorizer::Allow, None);
        let names = ["a.txt", "b.json", "c.bin", "d"];

        let output = h.service.process(input("batch", &names)).await.unwrap();

        assert_eq!(output.presigned_urls.len(), names.len());
        for name in names {
            assert!(!output.presigned_urls[name].is_empty());
        }
        assert_eq!(h.calls.signer.load(Ordering::SeqCst), names.len());
        assert_eq!(h.entries.lock().unwrap().len(), names.len());
    }

    /// 特殊文字を含むファイル名も変換せずにキーにする
    #[tokio::test]
    async fn test_file_key_keeps_special_characters() {
        let h = harness(MockAuthorizer::Allow, None);
        let names = ["dir/sub file.txt", "日本語.md", "a+b%20c?.txt", "../x"];

        h.service.process(input("b-1", &names)).await.unwrap();

        let keys: HashSet<String> = h
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.file_key.clone())
            .collect();
        for name in names {
            assert!(keys.contains(&format!("temp/b-1/{name}")), "name={name}");
        }
        assert_eq!(file_key("b1", "a b/c"), "temp/b1/a b/c");
    }

    /// 認証失敗時は発行・記録を行わない
    #[tokio::test]
    async fn test_unauthorized_has_no_side_effects() {
        for (authorizer, expect_not_found) in [
            (MockAuthorizer::NotFound, true),
            (MockAuthorizer::Unauthorized, false),
        ] {
            let h = harness(authorizer, None);
            let result = h.service.process(input("b1", &["a.txt", "b.txt"])).await;

            match result {
                Err(CliFilesError::ApiKeyNotFound(_)) => assert!(expect_not_found),
                Err(CliFilesError::NoAuthorizedApiKey(_)) => assert!(!expect_not_found),
                other => panic!("unexpected result: {other:?}"),
            }
            assert_eq!(h.calls.signer.load(Ordering::SeqCst), 0);
            assert_eq!(h.calls.ledger.load(Ordering::SeqCst), 0);
        }
    }

    /// 2件目の台帳書き込みが失敗すると全体が失敗する
    #[tokio::test]
    async fn test_ledger_failure_fails_whole_batch() {
        let h = harness(MockAuthorizer::Allow, Some(2));

        let result = h
            .service
            .process(input("b1", &["a.txt", "b.txt", "c.txt"]))
            .await;

        assert!(matches!(result, Err(CliFilesError::LedgerWrite(_))));
        // 他のファイルは中断されず完了する
        assert_eq!(h.calls.signer.load(Ordering::SeqCst), 3);
        assert_eq!(h.calls.ledger.load(Ordering::SeqCst), 3);
        assert_eq!(h.entries.lock().unwrap().len(), 2);
    }

    /// 同一入力で2回呼んでも衝突せず、file_idが異なるエントリが増える
    #[tokio::test]
    async fn test_repeated_calls_are_not_idempotent() {
        let h = harness(MockAuthorizer::Allow, None);

        h.service.process(input("b1", &["a.txt"])).await.unwrap();
        h.service.process(input("b1", &["a.txt"])).await.unwrap();

        let entries = h.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file_key, entries[1].file_key);
        assert_ne!(entries[0].file_id, entries[1].file_id);
    }

    /// 同名ファイルは結果マップ上で後勝ち、台帳には両方記録される
    #[tokio::test]
    async fn test_duplicate_names_last_write_wins() {
        let h = harness(MockAuthorizer::Allow, None);

        let output = h
            .service
            .process(input("b1", &["a.txt", "a.txt"]))
            .await
            .unwrap();

        assert_eq!(output.presigned_urls.len(), 1);
        assert_eq!(h.entries.lock().unwrap().len(), 2);
    }

    /// 空のbatch_idやファイル名は入力エラー（発行は行わない）
    #[tokio::test]
    async fn test_invalid_input() {
        let h = harness(MockAuthorizer::Allow, None);

        let result = h.service.process(input("", &["a.txt"])).await;
        assert!(matches!(result, Err(CliFilesError::BadRequest(_))));

        let result = h.service.process(input("b1", &["a.txt", ""])).await;
        assert!(matches!(result, Err(CliFilesError::BadRequest(_))));

        assert_eq!(h.calls.signer.load(Ordering::SeqCst), 0);
    }

    /// ヘッダーに使えないcontent_typeは、どのファイルの発行・記録も始める前に入力エラー
    #[tokio::test]
    async fn test_invalid_content_type_rejected_before_issuing() {
        let h = harness(MockAuthorizer::Allow, None);
        let mut request = input("b1", &["a.txt", "b.txt"]);
        request.files[1].content_type = "text/plain\n".to_string();

        let result = h.service.process(request).await;

        match result {
            Err(CliFilesError::BadRequest(message)) => assert!(message.contains("files[1]")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(h.calls.signer.load(Ordering::SeqCst), 0);
        assert_eq!(h.calls.ledger.load(Ordering::SeqCst), 0);
        assert!(h.entries.lock().unwrap().is_empty());
    }

    /// ファイルが0件なら空のマップを返す
    #[tokio::test]
    async fn test_empty_files() {
        let h = harness(MockAuthorizer::Allow, None);
        let output = h.service.process(input("b1", &[])).await.unwrap();
        assert!(output.presigned_urls.is_empty());
        assert_eq!(output.message, SUCCESS_MESSAGE);
    }

    /// バケット名パラメータが取得できなければ失敗する
    #[tokio::test]
    async fn test_missing_bucket_parameter() {
        let h = harness(MockAuthorizer::Allow, None);
        let service = TaskCliFilesService {
            parameters: Box::new(StaticParameterService::new(Vec::<(String, String)>::new())),
            ..h.service
        };

        let result = service.process(input("b1", &["a.txt"])).await;
        assert!(matches!(result, Err(CliFilesError::Parameter(_))));
        assert_eq!(h.calls.signer.load(Ordering::SeqCst), 0);
    }

    /// 有効期限の変更は署名と台帳の両方に反映される
    #[tokio::test]
    async fn test_custom_ttl() {
        let h = harness(MockAuthorizer::Allow, None);
        let ttl = NonZeroU32::new(2 * ONE_DAY_IN_SECONDS).unwrap();
        let service = h.service.with_ttl_secs(ttl);

        let before = now_millis().unwrap();
        service.process(input("b1", &["a.txt"])).await.unwrap();

        assert_eq!(h.requests.lock().unwrap()[0].3, 2 * ONE_DAY_IN_SECONDS);
        assert!(h.entries.lock().unwrap()[0].tti >= before + 2 * ONE_DAY_IN_MS);
    }
}
