use std::io::Read;
use std::process::Stdio;
use std::time::Duration;

use tokio::{io::AsyncWriteExt, process::Command, time::timeout};

use crate::core::{
    domain::CommandLine,
    errors::JudgeError,
    traits::process::{ProcessOutput, ProcessRunner},
};

/// Spawns real child processes with stdout and stderr sharing one pipe.
#[derive(Clone, Debug, Default)]
pub struct NativeProcessRunner;

#[async_trait::async_trait]
impl ProcessRunner for NativeProcessRunner {
    async fn run(
        &self,
        command: &CommandLine,
        stdin: &str,
        time_limit: Option<Duration>,
    ) -> Result<ProcessOutput, JudgeError> {
        tracing::debug!("Spawning {}", command);

        let (mut reader, writer) = std::io::pipe()?;
        // `cmd` holds the parent's write ends; it must be dropped for the reader to see EOF.
        let mut child = {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args)
                .stdin(Stdio::piped())
                .stdout(writer.try_clone()?)
                .stderr(writer)
                .kill_on_drop(true);
            // Background children stay in this group and die with it on timeout.
            #[cfg(unix)]
            cmd.process_group(0);
            cmd.spawn().map_err(|e| JudgeError::Internal {
                msg: format!("failed to spawn {}: {}", command, e),
            })?
        };
        let pid = child.id();

        let collector = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| buf)
        });

        if let Some(mut handle) = child.stdin.take() {
            let input = stdin.to_owned();
            tokio::spawn(async move {
                // The child may exit without reading everything; a broken pipe is fine.
                let _ = handle.write_all(input.as_bytes()).await;
            });
        }

        // The run ends at EOF on the output pipe, not at the first exit, so
        // a background child holding the pipe counts against the limit.
        let finished = async {
            let status = child.wait().await?;
            let bytes = collector.await.map_err(|e| JudgeError::Internal {
                msg: format!("output collector failed: {}", e),
            })??;
            Ok::<_, JudgeError>((status, bytes))
        };

        let (status, bytes) = match time_limit {
            Some(limit) => match timeout(limit, finished).await {
                Ok(finished) => finished?,
                Err(_) => {
                    tracing::debug!("{} exceeded {:?}, killing", command, limit);
                    if let Some(pid) = pid {
                        kill_process_group(pid);
                    }
                    let _ = child.kill().await;
                    return Ok(ProcessOutput {
                        status: None,
                        output: String::new(),
                        timed_out: true,
                    });
                }
            },
            None => finished.await?,
        };

        Ok(ProcessOutput {
            status: status.code(),
            output: String::from_utf8_lossy(&bytes).to_string(),
            timed_out: false,
        })
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::{
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    // ESRCH just means the whole group is already gone.
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        tracing::debug!("Failed to kill process group {}: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
