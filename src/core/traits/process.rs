use std::time::Duration;

use crate::core::{domain::CommandLine, errors::JudgeError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal or timed out.
    pub status: Option<i32>,
    /// Interleaved stdout and stderr.
    pub output: String,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status == Some(0)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProcessRunner: std::fmt::Debug + Send + Sync {
    /// Runs `command` to completion with `stdin` as its whole input. Only a
    /// `time_limit` bounds the call; without one it blocks until exit.
    async fn run(
        &self,
        command: &CommandLine,
        stdin: &str,
        time_limit: Option<Duration>,
    ) -> Result<ProcessOutput, JudgeError>;
}
