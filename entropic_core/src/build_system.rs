use crate::environment::{BuildEnvironment, FUZZER_LIB};
use crate::process::{ExitOutcome, render_command};
use log::{info, warn};
use std::convert::Infallible;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

/// Name under which benchmark build scripts expect the engine library.
pub const LIB_FUZZING_ENGINE: &str = "LIB_FUZZING_ENGINE";

/// Errors from running the benchmark build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The configured build command has no program to run.
    #[error("Build command is empty")]
    EmptyCommand,

    /// The build program could not be started at all.
    #[error("Failed to spawn build command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The build ran and exited with a non-zero status.
    #[error("Build exited with code {code}")]
    Failed { code: i32 },

    /// The build was terminated by a signal.
    #[error("Build terminated by signal {signal}")]
    Signaled { signal: i32 },

    #[error("Build exited abnormally")]
    Abnormal,
}

impl BuildError {
    /// The exit code a caller should propagate, if the build produced one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BuildError::Failed { code } => Some(*code),
            BuildError::Signaled { signal } => Some(128 + signal),
            _ => None,
        }
    }
}

/// The benchmark build system an engine adapter configures and then triggers.
///
/// Implementations own the flag accumulators and the environment overlay;
/// `build_benchmark` consumes whatever has been accumulated so far.
pub trait BuildSystem {
    type Error;

    /// Appends `flags` to the end of the accumulator called `name`.
    fn append_flags(&mut self, name: &str, flags: &[String]);

    /// Sets (overwrites) one environment variable for the build.
    fn set_env(&mut self, name: &str, value: &str);

    /// Produces the instrumented target. Blocks until the build finishes.
    fn build_benchmark(&mut self) -> Result<(), Self::Error>;
}

/// Accumulating into a bare environment is a dry run: nothing is built.
impl BuildSystem for BuildEnvironment {
    type Error = Infallible;

    fn append_flags(&mut self, name: &str, flags: &[String]) {
        BuildEnvironment::append_flags(self, name, flags);
    }

    fn set_env(&mut self, name: &str, value: &str) {
        self.set_var(name, value);
    }

    fn build_benchmark(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptBuildConfig {
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

/// Runs a build script as a child process with the accumulated overlay
/// applied on top of the inherited environment.
#[derive(Debug, Clone)]
pub struct ScriptBuildSystem {
    config: ScriptBuildConfig,
    env: BuildEnvironment,
}

impl ScriptBuildSystem {
    pub fn new(config: ScriptBuildConfig, env: BuildEnvironment) -> Self {
        Self { config, env }
    }

    pub fn environment(&self) -> &BuildEnvironment {
        &self.env
    }

    fn command(&self) -> Result<Command, BuildError> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or(BuildError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(cwd) = &self.config.working_dir {
            cmd.current_dir(cwd);
        }
        for (name, value) in self.env.env_pairs() {
            cmd.env(name, value);
        }
        if let Some(lib) = self.env.var(FUZZER_LIB) {
            cmd.env(LIB_FUZZING_ENGINE, lib);
        }
        Ok(cmd)
    }
}

impl BuildSystem for ScriptBuildSystem {
    type Error = BuildError;

    fn append_flags(&mut self, name: &str, flags: &[String]) {
        self.env.append_flags(name, flags);
    }

    fn set_env(&mut self, name: &str, value: &str) {
        self.env.set_var(name, value);
    }

    fn build_benchmark(&mut self) -> Result<(), BuildError> {
        let mut cmd = self.command()?;
        let line = render_command(&self.config.command[0], &self.config.command[1..]);
        info!("Building benchmark: {line}");

        let status = cmd.status().map_err(|source| BuildError::Spawn {
            command: line.clone(),
            source,
        })?;

        let result = match ExitOutcome::from(status) {
            ExitOutcome::Success => Ok(()),
            ExitOutcome::Code(code) => Err(BuildError::Failed { code }),
            ExitOutcome::Signal(signal) => Err(BuildError::Signaled { signal }),
            ExitOutcome::Abnormal => Err(BuildError::Abnormal),
        };
        if let Err(e) = &result {
            warn!("Benchmark build failed: {e}");
        }
        result
    }
}
