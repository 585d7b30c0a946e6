use log::debug;
use std::collections::BTreeMap;
use std::ffi::OsString;

pub const CFLAGS: &str = "CFLAGS";
pub const CXXFLAGS: &str = "CXXFLAGS";
pub const CC: &str = "CC";
pub const CXX: &str = "CXX";
pub const FUZZER_LIB: &str = "FUZZER_LIB";

/// Flag accumulators plus an environment overlay for one build step.
///
/// Nothing here touches the process environment. The overlay only becomes
/// visible to a child process once a [`crate::build_system::BuildSystem`]
/// hands [`BuildEnvironment::env_pairs`] to it.
///
/// Accumulated flags are kept as `OsString` so that flags inherited from the
/// environment survive byte for byte, even when they are not UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    flags: BTreeMap<String, Vec<OsString>>,
    vars: BTreeMap<String, String>,
}

impl BuildEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the `CFLAGS` and `CXXFLAGS` accumulators from whatever the
    /// current process has set, split on whitespace.
    pub fn seeded_from_process() -> Self {
        Self::seeded_from(|name| std::env::var_os(name))
    }

    /// Same as [`BuildEnvironment::seeded_from_process`], reading variables
    /// through `lookup`.
    pub fn seeded_from<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut env = Self::new();
        for name in [CFLAGS, CXXFLAGS] {
            if let Some(existing) = lookup(name) {
                let existing = split_flags(name, existing);
                if !existing.is_empty() {
                    debug!("Inherited {} flag(s) from {name}", existing.len());
                    env.flags.entry(name.to_string()).or_default().extend(existing);
                }
            }
        }
        env
    }

    /// Appends to the end of the named accumulator, creating it if needed.
    /// Existing flags are kept and duplicates are not removed.
    pub fn append_flags(&mut self, name: &str, flags: &[String]) {
        debug!("Appending {} flag(s) to {name}: {flags:?}", flags.len());
        self.flags
            .entry(name.to_string())
            .or_default()
            .extend(flags.iter().map(OsString::from));
    }

    /// Overwrites any previous value.
    pub fn set_var(&mut self, name: &str, value: &str) {
        debug!("Setting {name}={value}");
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn flags(&self, name: &str) -> &[OsString] {
        self.flags.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Renders accumulators (space-joined) followed by plain variables. When
    /// a name is used for both, the plain variable comes last and wins once
    /// applied to a `Command`.
    pub fn env_pairs(&self) -> Vec<(String, OsString)> {
        let mut pairs: Vec<(String, OsString)> = self
            .flags
            .iter()
            .map(|(name, flags)| (name.clone(), join_flags(flags)))
            .collect();
        pairs.extend(
            self.vars
                .iter()
                .map(|(k, v)| (k.clone(), OsString::from(v))),
        );
        pairs
    }
}

fn join_flags(flags: &[OsString]) -> OsString {
    let mut joined = OsString::new();
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            joined.push(" ");
        }
        joined.push(flag);
    }
    joined
}

fn split_flags(name: &str, value: OsString) -> Vec<OsString> {
    match value.into_string() {
        Ok(value) => value.split_whitespace().map(OsString::from).collect(),
        Err(raw) => split_raw_flags(name, raw),
    }
}

#[cfg(unix)]
fn split_raw_flags(_name: &str, raw: OsString) -> Vec<OsString> {
    use std::os::unix::ffi::{OsStrExt, OsStringExt};
    raw.as_bytes()
        .split(u8::is_ascii_whitespace)
        .filter(|token| !token.is_empty())
        .map(|token| OsString::from_vec(token.to_vec()))
        .collect()
}

#[cfg(not(unix))]
fn split_raw_flags(name: &str, raw: OsString) -> Vec<OsString> {
    log::warn!("{name} is not valid Unicode, keeping it as a single flag");
    vec![raw]
}
