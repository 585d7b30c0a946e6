use entropic_core::config::EntropicConfig;
use entropic_core::{BuildEnvironment, EntropicAdapter, LibFuzzerRunner, ScriptBuildSystem};

use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the benchmark instrumented for the Entropic engine.
    Build,
    /// Run an Entropic fuzzing campaign against a built target.
    Fuzz {
        #[clap(long)]
        input_corpus: PathBuf,
        #[clap(long)]
        output_corpus: PathBuf,
        #[clap(long)]
        target_binary: PathBuf,
    },
    /// Print the flags and variables `build` would pass, without building.
    ShowFlags,
}

fn load_config(path: Option<PathBuf>) -> Result<EntropicConfig, anyhow::Error> {
    match path {
        Some(config_path) => {
            info!("Loading configuration from specified path: {config_path:?}");
            EntropicConfig::load_from_file(&config_path)
        }
        None => {
            let default_config_path = PathBuf::from("entropic.toml");
            if default_config_path.exists() {
                info!("No config file specified via CLI, loading default: {default_config_path:?}");
                EntropicConfig::load_from_file(&default_config_path)
            } else {
                info!("No config file specified and default 'entropic.toml' not found, using built-in defaults.");
                Ok(EntropicConfig::default())
            }
        }
    }
}

fn initial_environment(config: &EntropicConfig) -> BuildEnvironment {
    if config.build.inherit_flags {
        BuildEnvironment::seeded_from_process()
    } else {
        BuildEnvironment::new()
    }
}

/// A failed child keeps its exit status so the harness sees what the build
/// or fuzzer returned.
fn exit_with(code: Option<i32>, err: anyhow::Error) -> Result<(), anyhow::Error> {
    match code {
        Some(code) => {
            error!("{err}");
            std::process::exit(code);
        }
        None => Err(err),
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = load_config(cli.config_file)?;
    let adapter = EntropicAdapter::new(config.engine.clone());

    match cli.command {
        Command::Build => {
            let mut build_system =
                ScriptBuildSystem::new(config.build.script_config(), initial_environment(&config));
            if let Err(e) = adapter.build(&mut build_system) {
                let code = e.exit_code();
                return exit_with(code, anyhow::Error::from(e));
            }
            info!("Benchmark build finished.");
        }
        Command::Fuzz {
            input_corpus,
            output_corpus,
            target_binary,
        } => {
            let mut runner = LibFuzzerRunner::new(config.runner.runner_config());
            if let Err(e) = adapter.fuzz(&mut runner, &input_corpus, &output_corpus, &target_binary)
            {
                let code = e.exit_code();
                return exit_with(code, anyhow::Error::from(e));
            }
            info!("Fuzzing campaign finished.");
        }
        Command::ShowFlags => {
            let mut env = initial_environment(&config);
            match adapter.build(&mut env) {
                Ok(()) => {}
                Err(never) => match never {},
            }
            for (name, value) in env.env_pairs() {
                println!("{name}={}", value.to_string_lossy());
            }
            println!("runtime flags: {}", adapter.profile().runtime_flags.join(" "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzz_subcommand_takes_three_paths() {
        let cli = Cli::parse_from([
            "entropic",
            "fuzz",
            "--input-corpus",
            "/corp/in",
            "--output-corpus",
            "/corp/out",
            "--target-binary",
            "/bin/target",
        ]);
        match cli.command {
            Command::Fuzz {
                input_corpus,
                output_corpus,
                target_binary,
            } => {
                assert_eq!(input_corpus, PathBuf::from("/corp/in"));
                assert_eq!(output_corpus, PathBuf::from("/corp/out"));
                assert_eq!(target_binary, PathBuf::from("/bin/target"));
            }
            other => panic!("Expected fuzz, got {other:?}"),
        }
    }

    #[test]
    fn config_file_is_a_global_option() {
        let cli = Cli::parse_from(["entropic", "--config-file", "bench.toml", "build"]);
        assert_eq!(cli.config_file, Some(PathBuf::from("bench.toml")));
        assert!(matches!(cli.command, Command::Build));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_config(Some(PathBuf::from("/nonexistent/entropic.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/entropic.toml"));
    }
}
