use crate::build_system::ScriptBuildConfig;
use crate::profile::EngineProfile;
use crate::runner::LibFuzzerRunnerConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct BuildSettings {
    #[serde(default = "default_build_command")]
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Seed `CFLAGS`/`CXXFLAGS` from the environment `entropic` runs in.
    #[serde(default = "default_true")]
    pub inherit_flags: bool,
}

pub fn default_build_command() -> Vec<String> {
    vec![
        "/bin/bash".to_string(),
        "-ex".to_string(),
        "/src/build.sh".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            command: default_build_command(),
            working_dir: None,
            inherit_flags: true,
        }
    }
}

impl BuildSettings {
    pub fn script_config(&self) -> ScriptBuildConfig {
        ScriptBuildConfig {
            command: self.command.clone(),
            working_dir: self.working_dir.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct RunnerSettings {
    #[serde(default)]
    pub additional_args: Vec<String>,
    #[serde(default = "default_true")]
    pub use_dictionary: bool,
    #[serde(default = "default_sanitizer_options")]
    pub sanitizer_options: BTreeMap<String, String>,
}

pub fn default_sanitizer_options() -> BTreeMap<String, String> {
    let mut options = BTreeMap::new();
    options.insert(
        "ASAN_OPTIONS".to_string(),
        "alloc_dealloc_mismatch=0:allocator_may_return_null=1:detect_leaks=1:\
         detect_odr_violation=0:handle_abort=1:handle_segv=1:handle_sigill=1:\
         symbolize=1:dedup_token_length=3"
            .to_string(),
    );
    options.insert(
        "UBSAN_OPTIONS".to_string(),
        "print_stacktrace=1:print_summary=1:silence_unsigned_overflow=1:\
         symbolize=1:dedup_token_length=3"
            .to_string(),
    );
    options
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            additional_args: Vec::new(),
            use_dictionary: true,
            sanitizer_options: default_sanitizer_options(),
        }
    }
}

impl RunnerSettings {
    pub fn runner_config(&self) -> LibFuzzerRunnerConfig {
        LibFuzzerRunnerConfig {
            additional_args: self.additional_args.clone(),
            use_dictionary: self.use_dictionary,
            sanitizer_options: self.sanitizer_options.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct EntropicConfig {
    #[serde(default)]
    pub engine: EngineProfile,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub runner: RunnerSettings,
}

impl EntropicConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_is_the_entropic_default() {
        let config = EntropicConfig::from_toml("").unwrap();
        assert_eq!(config.engine, EngineProfile::default());
        assert_eq!(config.build.command, default_build_command());
        assert!(config.build.inherit_flags);
        assert!(config.runner.use_dictionary);
        assert!(config.runner.sanitizer_options.contains_key("ASAN_OPTIONS"));
    }

    #[test]
    fn engine_fields_override_individually() {
        let config = EntropicConfig::from_toml(
            r#"
            [engine]
            no-builtin = ["memcmp", "strcmp"]
            fuzzer-lib = "/opt/libEntropic.a"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.no_builtin, vec!["memcmp", "strcmp"]);
        assert_eq!(config.engine.fuzzer_lib, PathBuf::from("/opt/libEntropic.a"));
        assert_eq!(config.engine.cc, "clang");
        assert_eq!(config.engine.runtime_flags, vec!["-entropic=1"]);
    }

    #[test]
    fn build_and_runner_sections_parse() {
        let config = EntropicConfig::from_toml(
            r#"
            [build]
            command = ["make", "-j4"]
            working-dir = "/src/bench"
            inherit-flags = false

            [runner]
            additional-args = ["-max_total_time=60"]
            use-dictionary = false
            sanitizer-options = { ASAN_OPTIONS = "detect_leaks=0" }
            "#,
        )
        .unwrap();
        let script = config.build.script_config();
        assert_eq!(script.command, vec!["make", "-j4"]);
        assert_eq!(script.working_dir, Some(PathBuf::from("/src/bench")));
        assert!(!config.build.inherit_flags);

        let runner = config.runner.runner_config();
        assert_eq!(runner.additional_args, vec!["-max_total_time=60"]);
        assert!(!runner.use_dictionary);
        assert_eq!(runner.sanitizer_options.len(), 1);
        assert_eq!(runner.sanitizer_options["ASAN_OPTIONS"], "detect_leaks=0");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(EntropicConfig::from_toml("[engine]\nscheduler = \"rare\"\n").is_err());
        assert!(EntropicConfig::from_toml("[fuzzer]\nthreads = 2\n").is_err());
    }

    #[test]
    fn load_from_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runner]\nadditional-args = [\"-runs=10\"]").unwrap();
        let config = EntropicConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.runner.additional_args, vec!["-runs=10"]);

        let missing = file.path().with_extension("missing");
        let err = EntropicConfig::load_from_file(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
