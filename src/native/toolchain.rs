use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::JudgeConfig,
    constants::{MANAGED_PROJECT_NAME, MANAGED_SOURCE_FILE},
    core::{
        domain::{CommandLine, SourceArtifact, SourceKind},
        errors::JudgeError,
        traits::{builder::Builder, process::ProcessRunner},
    },
    native::slots::BuildSlotPool,
};

/// Builds native sources with g++ and managed projects with dotnet.
#[derive(Debug)]
pub struct Toolchain {
    work_dir: PathBuf,
    gxx: PathBuf,
    native_flags: Vec<String>,
    dotnet: PathBuf,
    slots: BuildSlotPool,
    runner: Arc<dyn ProcessRunner>,
}

impl Toolchain {
    pub fn new(config: &JudgeConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Toolchain {
            work_dir: config.work_dir.clone(),
            gxx: config.gxx.clone(),
            native_flags: config.native_flags.clone(),
            dotnet: config.dotnet.clone(),
            slots: BuildSlotPool::new(config.slots_dir(), config.build_slots),
            runner,
        }
    }

    /// Timestamp plus random suffix, unique across concurrent builds.
    fn unique_name(&self) -> String {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}_{}", nanos, &suffix[..12])
    }

    async fn compile_native(&self, source: &Path) -> Result<PathBuf, JudgeError> {
        let output = self
            .work_dir
            .join(format!("{}{}", self.unique_name(), EXE_SUFFIX));

        let mut command = CommandLine::new(&self.gxx).arg(source);
        for flag in &self.native_flags {
            command = command.arg(flag);
        }
        let command = command.arg("-o").arg(&output);

        self.checked_build_step(&command, source).await?;
        self.ensure_created(&output, source).await?;

        tracing::info!("Compiled {} into {}", source.display(), output.display());
        Ok(output)
    }

    async fn build_managed(&self, source: &Path) -> Result<PathBuf, JudgeError> {
        let slot = self.slots.acquire().await?;
        let project = slot.dir().join(format!("{}.csproj", MANAGED_PROJECT_NAME));

        if !tokio::fs::try_exists(&project).await? {
            tracing::info!("Scaffolding project in build slot {}", slot.index());
            let scaffold = CommandLine::new(&self.dotnet)
                .arg("new")
                .arg("console")
                .arg("--force")
                .arg("-n")
                .arg(MANAGED_PROJECT_NAME)
                .arg("-o")
                .arg(slot.dir());
            self.checked_build_step(&scaffold, source).await?;
        }

        tokio::fs::copy(source, slot.dir().join(MANAGED_SOURCE_FILE)).await?;

        let out_dir = self
            .work_dir
            .join(format!("managed_{}", self.unique_name()));
        let build = CommandLine::new(&self.dotnet)
            .arg("build")
            .arg(&project)
            .arg("-c")
            .arg("Release")
            .arg("-o")
            .arg(&out_dir);
        self.checked_build_step(&build, source).await?;

        let executable = out_dir.join(format!("{}{}", MANAGED_PROJECT_NAME, EXE_SUFFIX));
        self.ensure_created(&executable, source).await?;

        tracing::info!(
            "Built {} in slot {} into {}",
            source.display(),
            slot.index(),
            executable.display()
        );
        Ok(executable)
    }

    async fn checked_build_step(
        &self,
        command: &CommandLine,
        source: &Path,
    ) -> Result<(), JudgeError> {
        let out = self.runner.run(command, "", None).await?;
        if !out.success() {
            tracing::debug!("Build step failed: {}", command);
            return Err(JudgeError::BuildFailed {
                source_path: source.into(),
                diagnostics: out.output,
            });
        }
        Ok(())
    }

    async fn ensure_created(&self, executable: &Path, source: &Path) -> Result<(), JudgeError> {
        if tokio::fs::try_exists(executable).await? {
            return Ok(());
        }
        Err(JudgeError::BuildFailed {
            source_path: source.into(),
            diagnostics: format!("executable was not created at: {}", executable.display()),
        })
    }
}

#[async_trait::async_trait]
impl Builder for Toolchain {
    #[tracing::instrument(skip(self), fields(path = %artifact.path.display()))]
    async fn build(&self, artifact: &SourceArtifact) -> Result<PathBuf, JudgeError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;

        match artifact.kind {
            SourceKind::CompiledNative => self.compile_native(&artifact.path).await,
            SourceKind::ManagedProject => self.build_managed(&artifact.path).await,
            kind => Err(JudgeError::Internal {
                msg: format!("{:?} sources are not built", kind),
            }),
        }
    }
}
