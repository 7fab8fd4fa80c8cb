use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::{
    constants::RECORD_DELIMITER,
    core::{
        domain::{CommandLine, StressReport, StressTrial, failure_record},
        engine::{JudgeEngine, TestRequest, with_separator},
        errors::JudgeError,
        protocol::split_on_line,
        traits::process::ProcessOutput,
    },
};

/// Programs taking part in a stress run.
#[derive(Clone, Copy, Debug)]
pub struct StressPlan<'a> {
    pub target: &'a CommandLine,
    /// Prints `input`, `answer` and `validator data` as one delimited record.
    pub generator: &'a CommandLine,
    pub validator: Option<&'a CommandLine>,
    /// Trusted solver whose output replaces the generator's answer.
    pub reference: Option<&'a CommandLine>,
    pub iterations: u32,
    pub log_path: &'a Path,
}

/// Fail-fast randomized differential testing loop.
#[derive(Clone, Debug)]
pub struct StressPipeline {
    engine: JudgeEngine,
}

impl StressPipeline {
    pub fn new(engine: JudgeEngine) -> Self {
        StressPipeline { engine }
    }

    /// Runs up to `plan.iterations` trials and stops at the first one that
    /// is not accepted, appending its full result to `plan.log_path`.
    #[tracing::instrument(skip(self, plan, on_trial), fields(iterations = plan.iterations))]
    pub async fn run<F>(
        &self,
        plan: &StressPlan<'_>,
        mut on_trial: F,
    ) -> Result<StressReport, JudgeError>
    where
        F: FnMut(&StressTrial),
    {
        let generator = with_separator(plan.generator);
        let mut max_elapsed_ms = 0;

        for iteration in 1..=plan.iterations {
            let generated = self.checked_run(&generator, "").await?;
            let fields = split_on_line(RECORD_DELIMITER, &generated.output, 3);
            let (input, generated_answer, validator_data) = (&fields[0], &fields[1], &fields[2]);

            let answer = match plan.reference {
                Some(reference) => self
                    .checked_run(reference, input)
                    .await?
                    .output
                    .trim()
                    .to_string(),
                None => generated_answer.clone(),
            };

            let request = TestRequest {
                input,
                answer: Some(&answer),
                test_id: None,
                validator_data,
            };
            let result = self
                .engine
                .run_test(&request, plan.target, plan.validator)
                .await?;

            let trial = StressTrial { iteration, result };
            on_trial(&trial);

            if !trial.result.passed() {
                tracing::info!("Trial {} failed with {}", iteration, trial.result.verdict);
                append_failure(plan.log_path, &failure_record(&trial.result)).await?;
                return Ok(StressReport::Failed {
                    iteration,
                    result: trial.result,
                    log_path: plan.log_path.into(),
                });
            }

            max_elapsed_ms = max_elapsed_ms.max(trial.result.elapsed_ms);
        }

        Ok(StressReport::Passed {
            iterations: plan.iterations,
            max_elapsed_ms,
        })
    }

    /// Generators and reference solvers must exit cleanly; they have no time limit.
    async fn checked_run(
        &self,
        command: &CommandLine,
        stdin: &str,
    ) -> Result<ProcessOutput, JudgeError> {
        let output = self.engine.runner().run(command, stdin, None).await?;
        if !output.success() {
            return Err(JudgeError::ProcessFailed {
                program: command.to_string(),
                status: output.status,
                output: output.output,
            });
        }
        Ok(output)
    }
}

async fn append_failure(log_path: &Path, record: &str) -> Result<(), JudgeError> {
    let mut log = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .await?;
    log.write_all(record.as_bytes()).await?;
    log.flush().await?;
    Ok(())
}
