use crate::process::{ExitOutcome, render_command};
use log::{info, warn};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Flags every libFuzzer-style campaign starts with, before engine flags.
pub const BASE_FLAGS: [&str; 6] = [
    "-print_final_stats=1",
    // Silence the target's own stdout and stderr.
    "-close_fd_mask=3",
    "-fork=1",
    "-ignore_ooms=1",
    "-ignore_timeouts=1",
    "-ignore_crashes=1",
];

pub const CRASHES_DIR: &str = "crashes";
pub const CORPUS_DIR: &str = "corpus";

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to prepare output directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn fuzzer '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Fuzzer exited with code {code}")]
    Failed { code: i32 },

    #[error("Fuzzer terminated by signal {signal}")]
    Signaled { signal: i32 },

    #[error("Fuzzer exited abnormally")]
    Abnormal,
}

impl RunError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunError::Failed { code } => Some(*code),
            RunError::Signaled { signal } => Some(128 + signal),
            _ => None,
        }
    }
}

/// Runs one fuzzing campaign against an instrumented target.
pub trait FuzzerRunner {
    type Error;

    /// Blocks until the campaign ends. `extra_flags` are engine-specific and
    /// are passed to the target after the runner's own flags.
    fn run_fuzzer(
        &mut self,
        input_corpus: &Path,
        output_corpus: &Path,
        target_binary: &Path,
        extra_flags: &[String],
    ) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Default)]
pub struct LibFuzzerRunnerConfig {
    /// Appended after the engine flags, e.g. `-max_total_time=3600`.
    pub additional_args: Vec<String>,
    /// Pass `<target>.dict` with `-dict=` when it exists.
    pub use_dictionary: bool,
    /// Variables such as `ASAN_OPTIONS` set on the fuzzer process only.
    pub sanitizer_options: BTreeMap<String, String>,
}

/// Shared runner for libFuzzer-compatible engines. Each campaign writes
/// discovered inputs to `<output>/corpus` and crash artifacts to
/// `<output>/crashes`, keeping them apart when the corpus is reloaded.
#[derive(Debug, Clone)]
pub struct LibFuzzerRunner {
    config: LibFuzzerRunnerConfig,
}

impl LibFuzzerRunner {
    pub fn new(config: LibFuzzerRunnerConfig) -> Self {
        Self { config }
    }

    /// Builds the full argument list that follows the target binary. Paths
    /// are carried as `OsString` so they reach the target unchanged.
    pub fn fuzzer_args(
        &self,
        input_corpus: &Path,
        output_corpus: &Path,
        target_binary: &Path,
        extra_flags: &[String],
    ) -> Vec<OsString> {
        let crashes_dir = output_corpus.join(CRASHES_DIR);
        let corpus_dir = output_corpus.join(CORPUS_DIR);

        let mut args: Vec<OsString> = BASE_FLAGS.iter().map(OsString::from).collect();
        let mut artifact_prefix = OsString::from("-artifact_prefix=");
        artifact_prefix.push(crashes_dir.as_os_str());
        artifact_prefix.push("/");
        args.push(artifact_prefix);
        args.extend(extra_flags.iter().map(OsString::from));
        args.extend(self.config.additional_args.iter().map(OsString::from));
        if self.config.use_dictionary {
            if let Some(dict) = dictionary_path(target_binary) {
                let mut dict_arg = OsString::from("-dict=");
                dict_arg.push(dict.as_os_str());
                args.push(dict_arg);
            }
        }
        args.push(corpus_dir.into_os_string());
        args.push(input_corpus.as_os_str().to_owned());
        args
    }
}

/// A dictionary sits next to the target as `<target>.dict`.
pub fn dictionary_path(target_binary: &Path) -> Option<PathBuf> {
    let mut name = target_binary.as_os_str().to_owned();
    name.push(".dict");
    let dict = PathBuf::from(name);
    dict.is_file().then_some(dict)
}

fn create_dir(path: &Path) -> Result<(), RunError> {
    fs::create_dir_all(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl FuzzerRunner for LibFuzzerRunner {
    type Error = RunError;

    fn run_fuzzer(
        &mut self,
        input_corpus: &Path,
        output_corpus: &Path,
        target_binary: &Path,
        extra_flags: &[String],
    ) -> Result<(), RunError> {
        create_dir(&output_corpus.join(CRASHES_DIR))?;
        create_dir(&output_corpus.join(CORPUS_DIR))?;

        let args = self.fuzzer_args(input_corpus, output_corpus, target_binary, extra_flags);
        let printable: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        let line = render_command(&target_binary.display().to_string(), &printable);
        info!("Running fuzzer: {line}");

        let mut cmd = Command::new(target_binary);
        cmd.args(&args);
        cmd.envs(&self.config.sanitizer_options);

        let status = cmd.status().map_err(|source| RunError::Spawn {
            command: line,
            source,
        })?;

        let result = match ExitOutcome::from(status) {
            ExitOutcome::Success => Ok(()),
            ExitOutcome::Code(code) => Err(RunError::Failed { code }),
            ExitOutcome::Signal(signal) => Err(RunError::Signaled { signal }),
            ExitOutcome::Abnormal => Err(RunError::Abnormal),
        };
        if let Err(e) = &result {
            warn!("Fuzzing campaign ended with an error: {e}");
        }
        result
    }
}
