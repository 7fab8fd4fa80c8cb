use std::path::PathBuf;

use crate::core::{domain::SourceArtifact, errors::JudgeError};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Builder: std::fmt::Debug + Send + Sync {
    /// Produces a fresh executable for a CompiledNative or ManagedProject
    /// source and returns its path.
    async fn build(&self, artifact: &SourceArtifact) -> Result<PathBuf, JudgeError>;
}
