use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::core::{
    domain::{CommandLine, SourceArtifact},
    errors::JudgeError,
    traits::{builder::Builder, store::ArtifactStore},
};

/// Digest of the source text; the file path plays no part in it.
pub fn content_hash(source: &[u8]) -> String {
    hex::encode(Sha256::digest(source))
}

/// Content-addressed cache of built executables.
#[derive(Clone, Debug)]
pub struct BuildCache {
    store: Arc<dyn ArtifactStore>,
    builder: Arc<dyn Builder>,
}

impl BuildCache {
    pub fn new(store: Arc<dyn ArtifactStore>, builder: Arc<dyn Builder>) -> Self {
        BuildCache { store, builder }
    }

    #[tracing::instrument(skip(self), fields(path = %artifact.path.display()))]
    pub async fn resolve_or_build(
        &self,
        artifact: &SourceArtifact,
    ) -> Result<CommandLine, JudgeError> {
        if let Some(executable) = self.cached_executable(&artifact.content_hash).await? {
            tracing::debug!("Cache hit: {}", executable.display());
            return Ok(CommandLine::new(executable));
        }

        tracing::info!("Building {:?} source {}", artifact.kind, artifact.path.display());
        let executable = self.builder.build(artifact).await?;
        self.store
            .insert(&artifact.content_hash, &executable)
            .await?;

        Ok(CommandLine::new(executable))
    }

    /// Returns the cached path only if it still exists on disk; a record
    /// pointing at a missing file is purged.
    async fn cached_executable(&self, content_hash: &str) -> Result<Option<PathBuf>, JudgeError> {
        let Some(executable) = self.store.lookup(content_hash).await? else {
            return Ok(None);
        };

        if tokio::fs::try_exists(&executable).await? {
            return Ok(Some(executable));
        }

        tracing::warn!(
            "Cached executable {} is gone, purging record",
            executable.display()
        );
        self.store.purge(content_hash).await?;
        Ok(None)
    }
}
