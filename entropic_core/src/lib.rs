pub mod adapter;
pub mod build_system;
pub mod config;
pub mod environment;
pub mod process;
pub mod profile;
pub mod runner;

pub use adapter::EntropicAdapter;
pub use build_system::{BuildError, BuildSystem, ScriptBuildConfig, ScriptBuildSystem};
pub use config::EntropicConfig;
pub use environment::BuildEnvironment;
pub use profile::EngineProfile;
pub use runner::{FuzzerRunner, LibFuzzerRunner, LibFuzzerRunnerConfig, RunError};
