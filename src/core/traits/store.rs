use std::path::{Path, PathBuf};

use crate::core::errors::JudgeError;

/// Persistent content-hash to executable-path table.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtifactStore: std::fmt::Debug + Send + Sync {
    async fn lookup(&self, content_hash: &str) -> Result<Option<PathBuf>, JudgeError>;

    async fn insert(&self, content_hash: &str, executable: &Path) -> Result<(), JudgeError>;

    async fn purge(&self, content_hash: &str) -> Result<(), JudgeError>;
}
