mod commands;
mod config;
mod manifest;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use halyard_reconciler::{Client, Lifecycle, cancel_pair};
use tokio::signal;

#[derive(Parser)]
#[command(name = "halyard")]
#[command(about = "Reconcile Cloud Monitoring resources against JSON manifests", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true, env = "HALYARD_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update resources so they match a manifest
    Apply {
        /// Manifest file, or - for stdin
        file: PathBuf,

        /// Fail instead of creating missing resources
        #[arg(long)]
        block_creation: bool,

        /// Fail instead of taking over existing resources
        #[arg(long)]
        block_acquire: bool,

        /// Fail if an existing resource would change
        #[arg(long)]
        block_modification: bool,
    },

    /// Print the current state of the resources named in a manifest
    Get {
        /// Manifest file, or - for stdin
        file: PathBuf,
    },

    /// List every resource of a kind
    List {
        /// UptimeCheckConfig, Service, ServiceLevelObjective or NotificationChannel
        kind: String,

        #[arg(long)]
        project: Option<String>,

        /// Parent service (ServiceLevelObjective only)
        #[arg(long)]
        service: Option<String>,

        /// Items per page; the server decides when unset
        #[arg(long)]
        page_size: Option<i32>,
    },

    /// Delete the resources named in a manifest
    Delete {
        /// Manifest file, or - for stdin
        file: PathBuf,
    },

    /// Delete every resource of a kind, optionally filtered by name prefix
    DeleteAll {
        kind: String,

        #[arg(long)]
        project: Option<String>,

        /// Parent service (ServiceLevelObjective only)
        #[arg(long)]
        service: Option<String>,

        /// Only delete resources whose name starts with this
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.json);

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_path()?,
    };

    // Config commands never touch the network.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Init { force } => commands::config_init(&config_path, *force),
            ConfigCommands::Show => commands::config_show(&config::load_or_default(&config_path)?),
        };
    }

    let settings = config::load_or_default(&config_path)?;
    let client = Client::from_config(settings.client)?;

    let (cancel_handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received SIGINT, cancelling");
            cancel_handle.cancel();
        }
    });

    match cli.command {
        Commands::Apply {
            file,
            block_creation,
            block_acquire,
            block_modification,
        } => {
            let lifecycle = Lifecycle {
                block_creation,
                block_acquire,
                block_modification,
            };
            commands::apply(&client, &file, lifecycle, &cancel).await
        }
        Commands::Get { file } => commands::get(&client, &file, &cancel).await,
        Commands::List {
            kind,
            project,
            service,
            page_size,
        } => {
            commands::list(
                &client,
                &kind,
                project.as_deref(),
                service.as_deref(),
                page_size,
                &cancel,
            )
            .await
        }
        Commands::Delete { file } => commands::delete(&client, &file, &cancel).await,
        Commands::DeleteAll {
            kind,
            project,
            service,
            prefix,
        } => {
            commands::delete_all(
                &client,
                &kind,
                project.as_deref(),
                service.as_deref(),
                prefix.as_deref(),
                &cancel,
            )
            .await
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
