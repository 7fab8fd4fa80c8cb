#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::JudgeConfig;
use crate::constants::{BANNER_WIDTH, RECORD_DELIMITER};
use crate::core::batch::run_test_set;
use crate::core::cache::BuildCache;
use crate::core::domain::{StressReport, TestCase, Verdict};
use crate::core::engine::{JudgeEngine, TestRequest};
use crate::core::resolver::ArtifactResolver;
use crate::core::stress::{StressPipeline, StressPlan};
use crate::core::traits::process::ProcessRunner;
use crate::native::process::NativeProcessRunner;
use crate::native::store::SqliteStore;
use crate::native::toolchain::Toolchain;

struct Fixture {
    dir: tempfile::TempDir,
    resolver: ArtifactResolver,
    engine: JudgeEngine,
}

impl Fixture {
    fn new(time_limit: Duration) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = JudgeConfig {
            work_dir: dir.path().join("work"),
            database: dir.path().join("judge.sqlite"),
            time_limit,
            ..JudgeConfig::default()
        };

        let store = Arc::new(SqliteStore::open(&config.database).expect("Failed to open store"));
        let runner: Arc<dyn ProcessRunner> = Arc::new(NativeProcessRunner);
        let toolchain = Arc::new(Toolchain::new(&config, runner.clone()));

        Fixture {
            resolver: ArtifactResolver::new(BuildCache::new(store, toolchain), &config),
            engine: JudgeEngine::new(runner, config.time_limit),
            dir,
        }
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).expect("Failed to write script");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

const SUM: &str = r#"
read n
read line
total=0
for x in $line; do total=$((total + x)); done
echo $total
"#;

#[tokio::test]
async fn test_sum_program_is_accepted() {
    let fixture = Fixture::new(Duration::from_secs(5));
    let target = fixture
        .resolver
        .resolve(&fixture.script("sum.sh", SUM))
        .await
        .expect("Resolution should succeed");

    let request = TestRequest {
        input: "3\n1 2 3\n",
        answer: Some("6"),
        ..Default::default()
    };
    let result = fixture
        .engine
        .run_test(&request, &target, None)
        .await
        .expect("Judging should succeed");

    assert_eq!(result.verdict, Verdict::Accepted);
    assert_eq!(result.output, "6");
}

#[tokio::test]
async fn test_verdicts_from_real_processes() {
    let fixture = Fixture::new(Duration::from_millis(500));
    let slow = fixture.script("slow.sh", "exec sleep 5\n");
    let crash = fixture.script("crash.sh", "echo partial\nexit 3\n");
    let wrong = fixture.script("wrong.sh", "echo 5\n");

    let request = TestRequest {
        input: "",
        answer: Some("6"),
        ..Default::default()
    };

    let mut verdicts = Vec::new();
    for script in [&slow, &crash, &wrong] {
        let target = fixture.resolver.resolve(script).await.unwrap();
        let result = fixture
            .engine
            .run_test(&request, &target, None)
            .await
            .unwrap();
        verdicts.push(result.verdict);
    }

    assert_eq!(
        verdicts,
        vec![Verdict::Timeout, Verdict::RuntimeError, Verdict::WrongAnswer]
    );
}

#[tokio::test]
async fn test_background_child_counts_against_time_limit() {
    let fixture = Fixture::new(Duration::from_millis(300));
    let target = fixture
        .resolver
        .resolve(&fixture.script("bg.sh", "sleep 3 &\necho 6\n"))
        .await
        .unwrap();

    let request = TestRequest {
        input: "",
        answer: Some("6"),
        ..Default::default()
    };
    let started = std::time::Instant::now();
    let result = fixture
        .engine
        .run_test(&request, &target, None)
        .await
        .unwrap();

    assert_eq!(result.verdict, Verdict::Timeout);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_validator_script_judges_output() {
    let fixture = Fixture::new(Duration::from_secs(5));
    let target = fixture
        .resolver
        .resolve(&fixture.script("any.sh", "echo 2 1\n"))
        .await
        .unwrap();
    // Accepts either order of the input's two numbers.
    let validator = fixture
        .resolver
        .resolve(&fixture.script(
            "validator.sh",
            &format!(
                "record=$(cat)\n\
                 [ \"$2\" = '{}' ] || exit 2\n\
                 output=$(printf '%s\\n' \"$record\" | sed -n '3p')\n\
                 [ \"$output\" = '2 1' ] || [ \"$output\" = '1 2' ] || \\\n\
                 {{ echo 'expected a permutation'; exit 1; }}\n",
                RECORD_DELIMITER
            ),
        ))
        .await
        .unwrap();

    let request = TestRequest {
        input: "1 2",
        answer: None,
        ..Default::default()
    };
    let result = fixture
        .engine
        .run_test(&request, &target, Some(&validator))
        .await
        .unwrap();

    assert_eq!(result.verdict, Verdict::Accepted, "{:?}", result.comment);
}

#[tokio::test]
async fn test_stress_run_stops_on_counterexample() {
    let fixture = Fixture::new(Duration::from_secs(5));
    let counter = fixture.path("calls");
    std::fs::write(&counter, "0").unwrap();

    // Emits n, then the advisory answer 2n.
    let generator = fixture.script(
        "gen.sh",
        &format!(
            "[ \"$1\" = '--separator' ] || exit 2\n\
             n=$(( $(cat {c}) + 1 ))\n\
             echo $n > {c}\n\
             echo $n\n\
             echo '{d}'\n\
             echo $((2 * n))\n",
            c = counter.display(),
            d = RECORD_DELIMITER
        ),
    );
    let target = fixture.script(
        "double.sh",
        "read n\nif [ \"$n\" -eq 4 ]; then echo 0; else echo $((2 * n)); fi\n",
    );

    let target = fixture.resolver.resolve(&target).await.unwrap();
    let generator = fixture.resolver.resolve(&generator).await.unwrap();
    let log_path = fixture.path("failed.txt");

    let plan = StressPlan {
        target: &target,
        generator: &generator,
        validator: None,
        reference: None,
        iterations: 10,
        log_path: &log_path,
    };
    let report = StressPipeline::new(fixture.engine.clone())
        .run(&plan, |_| {})
        .await
        .unwrap();

    assert!(matches!(report, StressReport::Failed { iteration: 4, .. }));
    assert_eq!(std::fs::read_to_string(&counter).unwrap().trim(), "4");

    let log = std::fs::read_to_string(&log_path).unwrap();
    let banner = "#".repeat(BANNER_WIDTH);
    assert_eq!(log.lines().filter(|line| *line == banner).count(), 2);
    assert!(log.contains("answer:\n8"));
}

#[tokio::test]
async fn test_batch_reports_failing_ids() {
    let fixture = Fixture::new(Duration::from_secs(5));
    let target = fixture
        .resolver
        .resolve(&fixture.script("sum.sh", SUM))
        .await
        .unwrap();

    let cases: Vec<_> = [("U1", "2\n1 1\n", "2"), ("U2", "1\n5\n", "6"), ("U3", "2\n2 2\n", "4")]
        .into_iter()
        .map(|(id, input, answer)| TestCase {
            problem_id: 1,
            id: id.to_string(),
            input: input.to_string(),
            expected_output: Some(answer.to_string()),
        })
        .collect();

    let report = run_test_set(&fixture.engine, &cases, &target, None)
        .await
        .unwrap();

    assert_eq!(report.passed(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].test_id.as_deref(), Some("U2"));
}

#[tokio::test]
async fn test_missing_source_fails_resolution() {
    let fixture = Fixture::new(Duration::from_secs(5));
    let result = fixture
        .resolver
        .resolve(Path::new("/no/such/solution.cpp"))
        .await;

    assert!(matches!(
        result,
        Err(crate::core::errors::JudgeError::NotFound { .. })
    ));
}
