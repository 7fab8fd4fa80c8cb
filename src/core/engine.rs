use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    constants::{RECORD_DELIMITER, SEPARATOR_FLAG},
    core::{
        domain::{CommandLine, TestResult, Verdict},
        errors::JudgeError,
        protocol::join_record,
        traits::process::ProcessRunner,
    },
};

/// One judging request against a single input.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestRequest<'a> {
    pub input: &'a str,
    pub answer: Option<&'a str>,
    pub test_id: Option<&'a str>,
    /// Extra field forwarded to the validator after the answer.
    pub validator_data: &'a str,
}

/// Appends the separator flag so a generator or validator learns the delimiter line.
pub fn with_separator(command: &CommandLine) -> CommandLine {
    command.clone().arg(SEPARATOR_FLAG).arg(RECORD_DELIMITER)
}

#[derive(Clone, Debug)]
pub struct JudgeEngine {
    runner: Arc<dyn ProcessRunner>,
    time_limit: Duration,
}

impl JudgeEngine {
    pub fn new(runner: Arc<dyn ProcessRunner>, time_limit: Duration) -> Self {
        JudgeEngine { runner, time_limit }
    }

    pub fn runner(&self) -> &Arc<dyn ProcessRunner> {
        &self.runner
    }

    /// Runs `target` once on the request input and classifies the outcome.
    ///
    /// Priority: timeout, then non-zero exit, then answer comparison (exact
    /// after trimming) or the validator's exit code when one is given.
    #[tracing::instrument(skip(self, request), fields(test_id = request.test_id))]
    pub async fn run_test(
        &self,
        request: &TestRequest<'_>,
        target: &CommandLine,
        validator: Option<&CommandLine>,
    ) -> Result<TestResult, JudgeError> {
        let answer_missing = request.answer.is_none_or(|answer| answer.trim().is_empty());
        if answer_missing && validator.is_none() {
            return Err(JudgeError::InvalidConfiguration(
                "an expected answer can't be empty without providing a validator".to_string(),
            ));
        }

        let started = Instant::now();
        let run = self
            .runner
            .run(target, request.input, Some(self.time_limit))
            .await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let output = run.output.trim().to_string();

        let (verdict, comment) = if run.timed_out {
            (
                Verdict::Timeout,
                Some(format!("exceeded {} ms", self.time_limit.as_millis())),
            )
        } else if run.status != Some(0) {
            let comment = match run.status {
                Some(code) => format!("exit status {}", code),
                None => "terminated by a signal".to_string(),
            };
            (Verdict::RuntimeError, Some(comment))
        } else if let Some(validator) = validator {
            self.validate(request, &output, validator).await?
        } else if output == request.answer.unwrap_or_default().trim() {
            (Verdict::Accepted, None)
        } else {
            (
                Verdict::WrongAnswer,
                Some("Output doesn't match answer".to_string()),
            )
        };

        tracing::debug!("Verdict {} in {} ms", verdict, elapsed_ms);

        Ok(TestResult {
            input: request.input.to_string(),
            output,
            expected_output: request.answer.map(String::from),
            verdict,
            elapsed_ms,
            comment,
            test_id: request.test_id.map(String::from),
        })
    }

    async fn validate(
        &self,
        request: &TestRequest<'_>,
        output: &str,
        validator: &CommandLine,
    ) -> Result<(Verdict, Option<String>), JudgeError> {
        let record = join_record(
            RECORD_DELIMITER,
            &[
                ("input", request.input),
                ("output", output),
                ("answer", request.answer.unwrap_or_default()),
                ("validator data", request.validator_data),
            ],
        )?;

        let checked = self
            .runner
            .run(&with_separator(validator), &record, None)
            .await?;

        if checked.success() {
            Ok((Verdict::Accepted, None))
        } else {
            Ok((Verdict::WrongAnswer, Some(checked.output)))
        }
    }
}
