use serde::Deserialize;
use std::path::PathBuf;

/// Coverage and comparison callbacks are emitted, but no default engine is linked.
pub const INSTRUMENTATION_FLAG: &str = "-fsanitize=fuzzer-no-link";

/// Libc comparison functions the compiler must not expand inline, so that the
/// engine's interceptors see every call.
///
/// Needed until the base builder image ships a clang with
/// <https://reviews.llvm.org/D83987>.
pub const NO_BUILTIN_FUNCTIONS: [&str; 9] = [
    "bcmp",
    "memcmp",
    "strncmp",
    "strcmp",
    "strncasecmp",
    "strcasecmp",
    "strstr",
    "strcasestr",
    "memmem",
];

/// Switches the engine scheduler into entropy-guided mode.
pub const ENTROPIC_FLAG: &str = "-entropic=1";

pub const DEFAULT_CC: &str = "clang";
pub const DEFAULT_CXX: &str = "clang++";
pub const DEFAULT_FUZZER_LIB: &str = "/libEntropic.a";

/// Everything the adapter needs to know about one engine variant: how to
/// instrument a target for it, which compilers and library to use, and
/// which flags select it at run time.
///
/// The defaults describe the Entropic engine. A TOML `[engine]` table can
/// override individual fields; see [`crate::config::EntropicConfig`].
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct EngineProfile {
    #[serde(default = "default_instrumentation_flag")]
    pub instrumentation_flag: String,
    #[serde(default = "default_no_builtin")]
    pub no_builtin: Vec<String>,
    #[serde(default = "default_cc")]
    pub cc: String,
    #[serde(default = "default_cxx")]
    pub cxx: String,
    #[serde(default = "default_fuzzer_lib")]
    pub fuzzer_lib: PathBuf,
    #[serde(default = "default_runtime_flags")]
    pub runtime_flags: Vec<String>,
}

fn default_instrumentation_flag() -> String {
    INSTRUMENTATION_FLAG.to_string()
}

fn default_no_builtin() -> Vec<String> {
    NO_BUILTIN_FUNCTIONS.iter().map(|f| f.to_string()).collect()
}

fn default_cc() -> String {
    DEFAULT_CC.to_string()
}

fn default_cxx() -> String {
    DEFAULT_CXX.to_string()
}

fn default_fuzzer_lib() -> PathBuf {
    PathBuf::from(DEFAULT_FUZZER_LIB)
}

fn default_runtime_flags() -> Vec<String> {
    vec![ENTROPIC_FLAG.to_string()]
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self {
            instrumentation_flag: default_instrumentation_flag(),
            no_builtin: default_no_builtin(),
            cc: default_cc(),
            cxx: default_cxx(),
            fuzzer_lib: default_fuzzer_lib(),
            runtime_flags: default_runtime_flags(),
        }
    }
}

impl EngineProfile {
    /// The flags appended to both `CFLAGS` and `CXXFLAGS`: the
    /// instrumentation flag, then one `-fno-builtin-<fn>` per entry of
    /// `no_builtin`, in order.
    pub fn compile_flags(&self) -> Vec<String> {
        let mut flags = Vec::with_capacity(1 + self.no_builtin.len());
        flags.push(self.instrumentation_flag.clone());
        flags.extend(self.no_builtin.iter().map(|f| format!("-fno-builtin-{f}")));
        flags
    }

    /// `FUZZER_LIB` is exported as a string; non UTF-8 paths are converted lossily.
    pub fn fuzzer_lib_value(&self) -> String {
        self.fuzzer_lib.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_compile_flags_are_the_fixed_list() {
        let flags = EngineProfile::default().compile_flags();
        assert_eq!(
            flags,
            vec![
                "-fsanitize=fuzzer-no-link",
                "-fno-builtin-bcmp",
                "-fno-builtin-memcmp",
                "-fno-builtin-strncmp",
                "-fno-builtin-strcmp",
                "-fno-builtin-strncasecmp",
                "-fno-builtin-strcasecmp",
                "-fno-builtin-strstr",
                "-fno-builtin-strcasestr",
                "-fno-builtin-memmem",
            ]
        );
    }

    #[test]
    fn empty_no_builtin_leaves_only_instrumentation() {
        let profile = EngineProfile {
            no_builtin: Vec::new(),
            ..EngineProfile::default()
        };
        assert_eq!(profile.compile_flags(), vec![INSTRUMENTATION_FLAG]);
    }

    #[test]
    fn default_runtime_flags_select_entropic() {
        let profile = EngineProfile::default();
        assert_eq!(profile.runtime_flags, vec!["-entropic=1"]);
        assert_eq!(profile.cc, "clang");
        assert_eq!(profile.cxx, "clang++");
        assert_eq!(profile.fuzzer_lib_value(), "/libEntropic.a");
    }
}
