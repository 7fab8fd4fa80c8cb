use crate::core::{
    domain::{BatchReport, CommandLine, TestCase},
    engine::{JudgeEngine, TestRequest},
    errors::JudgeError,
};

/// Judges every case independently. Verdicts are collected; only faults
/// such as a missing answer without a validator abort the run.
#[tracing::instrument(skip(engine, cases), fields(cases = cases.len()))]
pub async fn run_test_set(
    engine: &JudgeEngine,
    cases: &[TestCase],
    target: &CommandLine,
    validator: Option<&CommandLine>,
) -> Result<BatchReport, JudgeError> {
    let mut report = BatchReport {
        total: cases.len(),
        ..BatchReport::default()
    };

    for case in cases {
        tracing::debug!(problem_id = case.problem_id, test_id = %case.id, "Judging stored test");
        let request = TestRequest {
            input: &case.input,
            answer: case.expected_output.as_deref(),
            test_id: Some(&case.id),
            validator_data: "",
        };
        let result = engine.run_test(&request, target, validator).await?;

        if report
            .slowest
            .as_ref()
            .is_none_or(|slowest| result.elapsed_ms > slowest.elapsed_ms)
        {
            report.slowest = Some(result.clone());
        }
        if !result.passed() {
            report.failed.push(result);
        }
    }

    Ok(report)
}
