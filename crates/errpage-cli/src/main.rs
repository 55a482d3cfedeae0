mod commands;

use clap::{Parser, Subcommand};
use commands::{EXIT_DESIRED_ERROR, EXIT_FAILURE, EXIT_STORE_ERROR};
use errpage_core::ReconcilerConfig;
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_STORE: &str = "/etc/haproxy/errors";

#[derive(Debug, Parser)]
#[command(
    name = "errpage",
    version,
    about = "Reconcile custom HTTP error pages with a proxy's error-file bindings"
)]
struct Cli {
    /// Error-file store directory (overrides `store_dir` from --config).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Reconciler config TOML file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one reconciliation pass and print the resulting binding table.
    Reconcile {
        /// Desired-state TOML file.
        desired: PathBuf,
        /// Keep stored pages whose codes are absent from the desired state.
        #[arg(long, default_value_t = false)]
        no_prune: bool,
    },
    /// List stored error pages.
    List,
    /// Remove stored pages whose codes are absent from the desired state.
    Prune {
        /// Desired-state TOML file.
        desired: PathBuf,
        /// Only report what would be removed.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Validate a desired-state file without touching the store.
    Check {
        /// Desired-state TOML file.
        desired: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ERRPAGE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(&cli).and_then(|config| match cli.command {
        Commands::Reconcile { desired, no_prune } => {
            let prune = config.prune_orphans && !no_prune;
            commands::reconcile::run(&config.with_prune_orphans(prune), &desired, cli.json)
        }
        Commands::List => commands::list::run(&config, cli.json),
        Commands::Prune { desired, dry_run } => {
            commands::prune::run(&config, &desired, dry_run, cli.json)
        }
        Commands::Check { desired } => commands::check::run(&config, &desired, cli.json),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("desired state error:")
                || msg.starts_with("config error:")
            {
                EXIT_DESIRED_ERROR
            } else if msg.starts_with("store error:") || msg.starts_with("store lock:") {
                EXIT_STORE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn load_config(cli: &Cli) -> Result<ReconcilerConfig, String> {
    let mut config = match &cli.config {
        Some(path) => ReconcilerConfig::load(path).map_err(|e| match e {
            errpage_core::CoreError::Config(_) => e.to_string(),
            other => format!("config error: {other}"),
        })?,
        None => ReconcilerConfig::new(DEFAULT_STORE),
    };
    if let Some(store) = &cli.store {
        config.store_dir.clone_from(store);
    }
    tracing::debug!("using error-file store {}", config.store_dir.display());
    Ok(config)
}
