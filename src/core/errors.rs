use std::path::PathBuf;

/// Faults that abort the requested operation.
///
/// Judging outcomes such as a wrong answer or a timeout are not errors; they
/// are carried as [`crate::core::domain::Verdict`] values inside a test result.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("can't find source file: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported source kind '{extension}' for {}", path.display())]
    UnsupportedSourceKind { path: PathBuf, extension: String },

    #[error("couldn't build {} successfully:\n{diagnostics}", source_path.display())]
    BuildFailed {
        source_path: PathBuf,
        diagnostics: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{program} exited with status {status:?}:\n{output}")]
    ProcessFailed {
        program: String,
        status: Option<i32>,
        output: String,
    },

    #[error("{field} contains a line equal to the record delimiter")]
    DelimiterCollision { field: &'static str },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {msg}")]
    Internal { msg: String },
}
