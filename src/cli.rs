use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use itertools::Itertools;

use crate::{
    config::{JudgeConfig, default_database, default_native_flags, default_work_dir},
    core::{
        batch::run_test_set,
        cache::BuildCache,
        domain::{CommandLine, StressReport},
        engine::JudgeEngine,
        errors::JudgeError,
        resolver::ArtifactResolver,
        stress::{StressPipeline, StressPlan},
        traits::process::ProcessRunner,
    },
    native::{process::NativeProcessRunner, store::SqliteStore, toolchain::Toolchain},
    testset::{parse_selection, parse_test_file},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Local competitive-programming judge", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    settings: Settings,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Settings {
    /// Directory for built executables and build slots
    #[arg(long, env = "JUDGE_WORK_DIR", global = true)]
    work_dir: Option<PathBuf>,
    /// SQLite file with cached executables and test sets
    #[arg(long, env = "JUDGE_DATABASE", global = true)]
    database: Option<PathBuf>,
    #[arg(long, env = "JUDGE_GXX", default_value = "g++", global = true)]
    gxx: PathBuf,
    #[arg(long, env = "JUDGE_PYTHON", default_value = "python3", global = true)]
    python: PathBuf,
    #[arg(long, env = "JUDGE_SHELL", default_value = "sh", global = true)]
    shell: PathBuf,
    #[arg(long, env = "JUDGE_DOTNET", default_value = "dotnet", global = true)]
    dotnet: PathBuf,
    /// Concurrent managed-project builds, defaults to the CPU count
    #[arg(long, env = "JUDGE_BUILD_SLOTS", global = true)]
    build_slots: Option<usize>,
    /// Wall-clock limit for the tested program
    #[arg(long, env = "JUDGE_TIME_LIMIT_MS", default_value_t = 5000, global = true)]
    time_limit_ms: u64,
}

impl Settings {
    fn into_config(self) -> JudgeConfig {
        let work_dir = self.work_dir.unwrap_or_else(default_work_dir);
        JudgeConfig {
            database: self
                .database
                .unwrap_or_else(|| default_database(&work_dir)),
            work_dir,
            gxx: self.gxx,
            native_flags: default_native_flags(),
            python: self.python,
            shell: self.shell,
            dotnet: self.dotnet,
            build_slots: self.build_slots.unwrap_or_else(num_cpus::get),
            time_limit: Duration::from_millis(self.time_limit_ms),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a local problem
    AddProblem {
        problem: String,
    },
    /// Load a problem's tests from a file into the database
    LoadTests {
        problem: String,
        /// File holding the tests
        file: PathBuf,
        /// Line separating a test's input from its answer
        io_separator: String,
        /// Line separating tests; without it the file is one test
        #[arg(long)]
        tests_separator: Option<String>,
    },
    /// Run saved tests against a solution
    Test {
        problem: String,
        source: PathBuf,
        /// Test numbers to run, e.g. 1,2,4-6; all when omitted
        #[arg(long)]
        tests: Option<String>,
        /// Program judging the output instead of exact comparison
        #[arg(long)]
        validator: Option<PathBuf>,
    },
    /// Stress test a solution against generated cases
    Stress {
        problem: String,
        iterations: u32,
        source: PathBuf,
        /// Prints the case, its answer (may be empty) and validator data,
        /// separated by the delimiter line
        generator: PathBuf,
        /// Receives input, output, answer and validator data separated by the delimiter line
        #[arg(long)]
        validator: Option<PathBuf>,
        /// Trusted solution whose output replaces the generator's answer
        #[arg(long)]
        solver: Option<PathBuf>,
        /// Where the failing case is appended
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

/// Components wired from one configuration.
struct Judge {
    store: Arc<SqliteStore>,
    resolver: ArtifactResolver,
    engine: JudgeEngine,
}

impl Judge {
    fn new(config: &JudgeConfig) -> Result<Self, JudgeError> {
        let store = Arc::new(SqliteStore::open(&config.database)?);
        let runner: Arc<dyn ProcessRunner> = Arc::new(NativeProcessRunner);
        let toolchain = Arc::new(Toolchain::new(config, runner.clone()));
        let cache = BuildCache::new(store.clone(), toolchain);

        Ok(Judge {
            resolver: ArtifactResolver::new(cache, config),
            engine: JudgeEngine::new(runner, config.time_limit),
            store,
        })
    }

    fn problem(&self, name: &str) -> Result<i64, JudgeError> {
        self.store.problem_id(name)?.ok_or_else(|| {
            JudgeError::InvalidConfiguration(format!("there is no problem with id {}", name))
        })
    }

    async fn resolve_optional(
        &self,
        path: Option<&Path>,
    ) -> Result<Option<CommandLine>, JudgeError> {
        match path {
            Some(path) => Ok(Some(self.resolver.resolve(path).await?)),
            None => Ok(None),
        }
    }
}

pub async fn execute(cli: Cli) -> Result<(), JudgeError> {
    let config = cli.settings.into_config();
    tracing::debug!("Configuration: {:?}", config);
    let judge = Judge::new(&config)?;

    match cli.command {
        Commands::AddProblem { problem } => {
            judge.store.add_problem(&problem)?;
            println!("Added 1 problem with id = {}", problem);
        }
        Commands::LoadTests {
            problem,
            file,
            io_separator,
            tests_separator,
        } => {
            let problem_id = judge.problem(&problem)?;
            let text = tokio::fs::read_to_string(&file).await?;
            let tests = parse_test_file(&text, &io_separator, tests_separator.as_deref());

            match judge.store.append_tests(problem_id, &tests)? {
                None => println!("No tests were loaded"),
                Some((first, last)) if first == last => {
                    println!("Loaded 1 test with id = {}", first)
                }
                Some((first, last)) => println!("Loaded tests {}..{}", first, last),
            }
        }
        Commands::Test {
            problem,
            source,
            tests,
            validator,
        } => {
            let problem_id = judge.problem(&problem)?;
            let selection = tests.as_deref().map(parse_selection).transpose()?;
            let target = judge.resolver.resolve(&source).await?;
            let validator = judge.resolve_optional(validator.as_deref()).await?;

            let cases = judge.store.load_tests(problem_id, selection.as_deref())?;
            if cases.is_empty() {
                println!("No tests were found");
                return Ok(());
            }

            let report = run_test_set(&judge.engine, &cases, &target, validator.as_ref()).await?;
            println!(
                "Ran {} tests, {} passed and {} failed",
                report.total,
                report.passed(),
                report.failed.len()
            );
            if let Some(slowest) = &report.slowest {
                println!(
                    "Max elapsed test is {} and it took {}ms",
                    slowest.test_id.as_deref().unwrap_or("?"),
                    slowest.elapsed_ms
                );
            }
            if !report.failed.is_empty() {
                let ids = report
                    .failed
                    .iter()
                    .map(|r| r.test_id.as_deref().unwrap_or("?"))
                    .join(", ");
                println!("Failed tests ids are: {}", ids);
            }
        }
        Commands::Stress {
            problem,
            iterations,
            source,
            generator,
            validator,
            solver,
            log,
        } => {
            if iterations == 0 {
                return Ok(());
            }

            let target = judge.resolver.resolve(&source).await?;
            let generator = judge.resolver.resolve(&generator).await?;
            let validator = judge.resolve_optional(validator.as_deref()).await?;
            let reference = judge.resolve_optional(solver.as_deref()).await?;
            let log_path = log.unwrap_or_else(|| default_log_path(&problem));

            let plan = StressPlan {
                target: &target,
                generator: &generator,
                validator: validator.as_ref(),
                reference: reference.as_ref(),
                iterations,
                log_path: &log_path,
            };
            let report = StressPipeline::new(judge.engine.clone())
                .run(&plan, |trial| {
                    let status = if trial.result.passed() { "Passed" } else { "Failed" };
                    println!("Test case #{}: {}", trial.iteration, status);
                })
                .await?;

            match report {
                StressReport::Passed {
                    iterations,
                    max_elapsed_ms,
                } => {
                    println!("Ran {} tests successfully", iterations);
                    println!("Max elapsed test took {}ms", max_elapsed_ms);
                }
                StressReport::Failed {
                    iteration,
                    result,
                    log_path,
                } => {
                    println!(
                        "Test case #{} got {}, see file {} for additional info",
                        iteration,
                        result.verdict,
                        log_path.display()
                    );
                }
            }
        }
    }

    Ok(())
}

fn default_log_path(problem: &str) -> PathBuf {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    PathBuf::from(format!("problem{}_{}_FailedTestCase.txt", problem, nanos))
}
