mod cmd;
mod locate;
mod output;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, plan::PlanArgs, run::RunArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "extvar",
    about = "Extract named variables from a climate-model history archive into a variable-keyed tree",
    version,
    propagate_version = true
)]
struct Cli {
    /// Run configuration (default: nearest extvar.yaml in or above the current directory)
    #[arg(long, short = 'c', global = true, env = "EXTVAR_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every configured variable, one worker per (ensemble, component)
    Run(RunArgs),

    /// Show the source, destination and commands for a single month
    Plan(PlanArgs),

    /// Create, inspect and validate the run configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Check that the NCO operators resolve on PATH
    Toolchain,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let explicit = cli.config.as_deref();
    let config_path = locate::resolve_config(explicit);

    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(&config_path, args, cli.json),
        Commands::Plan(args) => cmd::plan::run(&config_path, args, cli.json),
        Commands::Config { subcommand } => {
            let init_target = locate::init_target(explicit);
            cmd::config::run(&config_path, &init_target, subcommand, cli.json)
        }
        Commands::Toolchain => cmd::toolchain::run(&config_path, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
