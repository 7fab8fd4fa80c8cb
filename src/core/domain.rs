use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::BANNER_WIDTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpreter {
    Python,
    Shell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Prebuilt,
    Interpreted(Interpreter),
    CompiledNative,
    ManagedProject,
}

impl SourceKind {
    /// Classifies a path purely by its extension. `None` means the
    /// extension is not one the judge knows how to run.
    pub fn from_path(path: &Path) -> Option<Self> {
        let Some(extension) = path.extension() else {
            return Some(SourceKind::Prebuilt);
        };

        match extension.to_string_lossy().to_lowercase().as_str() {
            "exe" | "out" | "bin" => Some(SourceKind::Prebuilt),
            "py" => Some(SourceKind::Interpreted(Interpreter::Python)),
            "sh" => Some(SourceKind::Interpreted(Interpreter::Shell)),
            "cpp" | "cc" | "cxx" => Some(SourceKind::CompiledNative),
            "cs" => Some(SourceKind::ManagedProject),
            _ => None,
        }
    }

    pub fn needs_build(&self) -> bool {
        matches!(self, SourceKind::CompiledNative | SourceKind::ManagedProject)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceArtifact {
    pub path: PathBuf,
    pub content_hash: String,
    pub kind: SourceKind,
}

/// Program plus arguments, ready to be spawned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        CommandLine {
            program: program.as_ref().into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    Timeout,
    RuntimeError,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong answer",
            Verdict::Timeout => "Timed out",
            Verdict::RuntimeError => "Runtime error",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub problem_id: i64,
    pub id: String,
    pub input: String,
    /// Absent or blank only for problems judged by a validator.
    pub expected_output: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestResult {
    pub input: String,
    pub output: String,
    pub expected_output: Option<String>,
    pub verdict: Verdict,
    pub elapsed_ms: u64,
    pub comment: Option<String>,
    pub test_id: Option<String>,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(test_id) = &self.test_id {
            writeln!(f, "Test Id: {}", test_id)?;
        }
        writeln!(f, "verdict: {}", self.verdict)?;
        writeln!(f, "elapsed: {}", self.elapsed_ms)?;
        if let Some(comment) = &self.comment {
            writeln!(f, "comment:\n{}", comment)?;
        }
        writeln!(f, "input:\n{}", self.input)?;
        writeln!(f, "output:\n{}", self.output)?;
        write!(
            f,
            "answer:\n{}",
            self.expected_output.as_deref().unwrap_or_default()
        )
    }
}

/// Banner-delimited record appended to the stress log for a failing trial.
pub fn failure_record(result: &TestResult) -> String {
    let banner = "#".repeat(BANNER_WIDTH);
    format!("{banner}\n{result}\n{banner}\n")
}

#[derive(Clone, Debug)]
pub struct StressTrial {
    pub iteration: u32,
    pub result: TestResult,
}

#[derive(Clone, Debug)]
pub enum StressReport {
    Passed {
        iterations: u32,
        max_elapsed_ms: u64,
    },
    Failed {
        iteration: u32,
        result: TestResult,
        log_path: PathBuf,
    },
}

#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub failed: Vec<TestResult>,
    pub slowest: Option<TestResult>,
}

impl BatchReport {
    pub fn passed(&self) -> usize {
        self.total - self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            SourceKind::from_path(Path::new("a/sol.CPP")),
            Some(SourceKind::CompiledNative)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("gen.py")),
            Some(SourceKind::Interpreted(Interpreter::Python))
        );
        assert_eq!(
            SourceKind::from_path(Path::new("Program.cs")),
            Some(SourceKind::ManagedProject)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("./a.out")),
            Some(SourceKind::Prebuilt)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("/usr/bin/solution")),
            Some(SourceKind::Prebuilt)
        );
        assert_eq!(SourceKind::from_path(Path::new("main.hs")), None);
    }

    #[test]
    fn test_failure_record_layout() {
        let result = TestResult {
            input: "1 2".to_string(),
            output: "4".to_string(),
            expected_output: Some("3".to_string()),
            verdict: Verdict::WrongAnswer,
            elapsed_ms: 12,
            comment: None,
            test_id: Some("U3".to_string()),
        };

        let record = failure_record(&result);
        let lines: Vec<_> = record.lines().collect();

        assert_eq!(lines.first().unwrap().len(), BANNER_WIDTH);
        assert_eq!(lines.last().unwrap().len(), BANNER_WIDTH);
        assert_eq!(lines[1], "Test Id: U3");
        assert_eq!(lines[2], "verdict: Wrong answer");
        assert_eq!(lines[3], "elapsed: 12");
        assert!(record.contains("input:\n1 2\noutput:\n4\nanswer:\n3\n"));
    }
}
