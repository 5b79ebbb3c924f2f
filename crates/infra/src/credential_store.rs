//! # 認証情報ストア
//!
//! メッセージングセッションの認証情報を namespace 単位で永続化する。
//! 再起動後も端末での再認証なしにセッションを再開するために使用する。
//!
//! ## 設計方針
//!
//! - **内容は不透明**: 認証情報はメッセージングクライアントが発行する JSON をそのまま保存する
//! - **原子的な書き込み**: 一時ファイルに書いてから rename し、書き込み途中のファイルを残さない
//! - **namespace の制限**: ディレクトリ名として安全な文字（英数字・`-`・`_`）のみ許可する

use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;

use crate::error::InfraError;

const CREDENTIALS_FILE: &str = "creds.json";
const TEMP_FILE: &str = "creds.json.tmp";

/// 認証情報ストア
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 保存済みの認証情報を読み込む（未保存なら `None`）
    async fn load(&self, namespace: &str) -> Result<Option<serde_json::Value>, InfraError>;

    /// 認証情報を保存する（既存の内容は置き換える）
    async fn save(&self, namespace: &str, credentials: &serde_json::Value)
    -> Result<(), InfraError>;

    /// 認証情報を破棄する（未保存でもエラーにしない）
    async fn clear(&self, namespace: &str) -> Result<(), InfraError>;
}

/// ファイルシステム上の認証情報ストア
///
/// `{root}/{namespace}/creds.json` に保存する。
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn namespace_dir(&self, namespace: &str) -> Result<PathBuf, InfraError> {
        let valid = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(InfraError::invalid_input(format!(
                "namespace に使用できない文字が含まれています: {namespace:?}"
            )));
        }
        Ok(self.root.join(namespace))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[tracing::instrument(skip_all, fields(namespace = %namespace))]
    async fn load(&self, namespace: &str) -> Result<Option<serde_json::Value>, InfraError> {
        let path = self.namespace_dir(namespace)?.join(CREDENTIALS_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip_all, fields(namespace = %namespace))]
    async fn save(
        &self,
        namespace: &str,
        credentials: &serde_json::Value,
    ) -> Result<(), InfraError> {
        let dir = self.namespace_dir(namespace)?;
        tokio::fs::create_dir_all(&dir).await?;

        let bytes = serde_json::to_vec(credentials)?;
        let temp = dir.join(TEMP_FILE);
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, dir.join(CREDENTIALS_FILE)).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(namespace = %namespace))]
    async fn clear(&self, namespace: &str) -> Result<(), InfraError> {
        let dir = self.namespace_dir(namespace)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
