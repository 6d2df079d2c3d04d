//! Ferry example host
//!
//! Registers a handful of demo functions on a runtime and drives them
//! through the value bridge from the command line.

mod demo;

use clap::{Parser as ClapParser, Subcommand};
use ferry_bridge::{Runtime, RuntimeConfig};
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(ClapParser)]
#[command(name = "ferry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Call host functions through the ferry value bridge", long_about = None)]
struct Cli {
    /// Runtime configuration (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log bridge activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a registered function and print its results
    Call {
        /// Function name, `library.function` for library members
        function: String,

        /// Arguments: integers, numbers, true/false/nil, anything else is a string
        #[arg(allow_hyphen_values = true, allow_negative_numbers = true)]
        args: Vec<String>,
    },

    /// Print the example globals read back through the bridge
    Globals,

    /// List registered functions
    Functions,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => match RuntimeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => RuntimeConfig::default(),
    };

    let mut runtime = Runtime::new(config);
    if let Err(e) = demo::install(&mut runtime) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    info!(functions = runtime.function_names().len(), "runtime ready");

    match cli.command {
        Commands::Call { function, args } => run_call(&mut runtime, &function, &args),
        Commands::Globals => run_globals(&mut runtime),
        Commands::Functions => {
            for name in runtime.function_names() {
                println!("{}", name);
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_call(runtime: &mut Runtime, function: &str, args: &[String]) {
    let args: Vec<_> = args.iter().map(|arg| demo::parse_argument(arg)).collect();
    match runtime.call_values(function, &args) {
        Ok(results) => {
            for value in &results {
                println!("{}", demo::render(value));
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_globals(runtime: &mut Runtime) {
    match runtime.get_global::<String>("VERSION") {
        Ok(version) => println!("VERSION = {}", version),
        Err(e) => eprintln!("VERSION: {}", e),
    }
    match runtime.get_global::<i64>("V") {
        Ok(v) => println!("V = {}", v),
        Err(e) => eprintln!("V: {}", e),
    }
    // V is an integer; reading it as a boolean must fail
    if let Err(e) = runtime.get_global::<bool>("V") {
        println!("V as boolean: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_call_accepts_negative_arguments() {
        let cli = Cli::try_parse_from(["ferry", "call", "divmod", "-7", "2"]).unwrap();
        match cli.command {
            Commands::Call { function, args } => {
                assert_eq!(function, "divmod");
                assert_eq!(args, vec!["-7", "2"]);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ferry", "functions", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_config_file_feeds_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.toml");
        std::fs::write(&path, "stack_limit = 128\n").unwrap();

        let config = RuntimeConfig::load(&path).unwrap();
        let runtime = Runtime::new(config);
        assert_eq!(runtime.config().stack_limit, 128);
    }
}
