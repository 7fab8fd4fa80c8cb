use std::path::Path;

use crate::{
    config::JudgeConfig,
    core::{
        cache::{BuildCache, content_hash},
        domain::{CommandLine, Interpreter, SourceArtifact, SourceKind},
        errors::JudgeError,
    },
};

/// Turns a source path into the command line that runs it.
#[derive(Clone, Debug)]
pub struct ArtifactResolver {
    cache: BuildCache,
    python: std::path::PathBuf,
    shell: std::path::PathBuf,
}

impl ArtifactResolver {
    pub fn new(cache: BuildCache, config: &JudgeConfig) -> Self {
        ArtifactResolver {
            cache,
            python: config.python.clone(),
            shell: config.shell.clone(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, path: &Path) -> Result<CommandLine, JudgeError> {
        let artifact = inspect_source(path).await?;
        tracing::debug!("Resolved {} as {:?}", path.display(), artifact.kind);

        match artifact.kind {
            SourceKind::Prebuilt => Ok(CommandLine::new(&artifact.path)),
            SourceKind::Interpreted(Interpreter::Python) => {
                Ok(CommandLine::new(&self.python).arg(&artifact.path))
            }
            SourceKind::Interpreted(Interpreter::Shell) => {
                Ok(CommandLine::new(&self.shell).arg(&artifact.path))
            }
            SourceKind::CompiledNative | SourceKind::ManagedProject => {
                self.cache.resolve_or_build(&artifact).await
            }
        }
    }
}

/// Checks the path is a regular file, classifies it and hashes its content.
pub async fn inspect_source(path: &Path) -> Result<SourceArtifact, JudgeError> {
    let not_found = || JudgeError::NotFound { path: path.into() };

    let metadata = tokio::fs::metadata(path).await.map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    let kind = SourceKind::from_path(path).ok_or_else(|| JudgeError::UnsupportedSourceKind {
        path: path.into(),
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default(),
    })?;

    let path = std::path::absolute(path)?;
    let source = tokio::fs::read(&path).await?;

    Ok(SourceArtifact {
        content_hash: content_hash(&source),
        path,
        kind,
    })
}
