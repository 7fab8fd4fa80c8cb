use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DATABASE_FILE_NAME, DEFAULT_TIME_LIMIT};

/// Settings shared by every component, built once in `main` and passed down.
#[derive(Clone, Debug)]
pub struct JudgeConfig {
    /// Base directory for built executables and build slots.
    pub work_dir: PathBuf,
    pub database: PathBuf,
    pub gxx: PathBuf,
    pub native_flags: Vec<String>,
    pub python: PathBuf,
    pub shell: PathBuf,
    pub dotnet: PathBuf,
    pub build_slots: usize,
    pub time_limit: Duration,
}

impl JudgeConfig {
    pub fn slots_dir(&self) -> PathBuf {
        self.work_dir.join("slots")
    }
}

pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("judgebox")
}

pub fn default_database(work_dir: &std::path::Path) -> PathBuf {
    work_dir.join(DATABASE_FILE_NAME)
}

/// Flags passed to the native compiler between the source path and `-o`.
pub fn default_native_flags() -> Vec<String> {
    let stack = if cfg!(windows) {
        "-Wl,--stack=268435456"
    } else {
        "-Wl,-z,stacksize=268435456"
    };
    ["-static", "-DONLINE_JUDGE", stack, "-O2", "-std=c++17"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for JudgeConfig {
    fn default() -> Self {
        let work_dir = default_work_dir();
        JudgeConfig {
            database: default_database(&work_dir),
            work_dir,
            gxx: "g++".into(),
            native_flags: default_native_flags(),
            python: "python3".into(),
            shell: "sh".into(),
            dotnet: "dotnet".into(),
            build_slots: num_cpus::get(),
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}
