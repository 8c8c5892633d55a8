//! Keel - local instance lifecycle manager
//!
//! This is the main CLI entry point for Keel.

use clap::{Parser, Subcommand};
use keel::config::{parse_timeout, DaemonConfig};
use keel::daemon::Daemon;
use keel::error::Result;
use keel::lifecycle::{InstallSpec, DEFAULT_TAG};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Keel - install and run compose-defined service instances
#[derive(Parser)]
#[command(name = "keel")]
#[command(author = "Evoker Industries")]
#[command(version)]
#[command(about = "Install, start, stop and uninstall local service instances", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Directory holding installed instances
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seconds to wait for an instance lock before giving up
    #[arg(long, global = true)]
    lock_timeout: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install an instance from a repository
    Install {
        /// Repository URL or local checkout path
        url: String,
        /// Profile to install
        #[arg(short, long)]
        profile: String,
        /// Git ref to install
        #[arg(short, long)]
        version: Option<String>,
        /// Tag distinguishing installs of the same repository
        #[arg(short, long, default_value = DEFAULT_TAG)]
        tag: String,
        /// Do not start the instance after installing
        #[arg(long)]
        no_start: bool,
    },

    /// Start an instance
    #[command(visible_alias = "start")]
    Run {
        /// Instance ID ([repository-name]-[tag])
        instance_id: String,
    },

    /// Stop an instance
    Stop {
        /// Instance ID ([repository-name]-[tag])
        instance_id: String,
    },

    /// Stop an instance and remove all its data
    Uninstall {
        /// Instance ID ([repository-name]-[tag])
        instance_id: String,
    },

    /// List installed instances
    #[command(name = "ls")]
    List {
        /// Only print instance IDs
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the state of an instance
    Status {
        /// Instance ID ([repository-name]-[tag])
        instance_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<DaemonConfig> {
    let mut config = DaemonConfig::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config = config.data_dir(std::path::absolute(dir)?);
    }
    if let Some(raw) = &cli.lock_timeout {
        config = config.lock_timeout(Some(parse_timeout(raw)?));
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let daemon = Daemon::new(&config)?;

    match cli.command {
        Commands::Install {
            url,
            profile,
            version,
            tag,
            no_start,
        } => {
            let mut spec = InstallSpec::new(&url, &profile).tag(&tag);
            if let Some(v) = version {
                spec = spec.version(&v);
            }

            let id = daemon.install(&spec).await?;
            println!("Installed {}", id);

            if !no_start {
                daemon.start(&id).await?;
                println!("Started {}", id);
            }
        }

        Commands::Run { instance_id } => {
            daemon.start(&instance_id).await?;
            println!("Started {}", instance_id);
        }

        Commands::Stop { instance_id } => {
            daemon.stop(&instance_id).await?;
            println!("Stopped {}", instance_id);
        }

        Commands::Uninstall { instance_id } => {
            if daemon.uninstall(&instance_id).await? {
                println!("Uninstalled {}", instance_id);
            } else {
                println!("{} is not installed", instance_id);
            }
        }

        Commands::List { quiet } => {
            let ids = daemon.list()?;

            if quiet {
                for id in ids {
                    println!("{}", id);
                }
            } else {
                println!(
                    "{:<30} {:<12} {:<20} {:<12} {:<20}",
                    "INSTANCE ID", "STATE", "PROFILE", "VERSION", "INSTALLED"
                );
                for id in ids {
                    let state = daemon.state(&id).await?;
                    let (profile, version, installed) = match daemon.instance(&id)?.metadata() {
                        Ok(m) => (
                            m.profile,
                            m.version.unwrap_or_else(|| "-".to_string()),
                            m.installed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        ),
                        Err(_) => ("?".to_string(), "?".to_string(), "?".to_string()),
                    };
                    println!(
                        "{:<30} {:<12} {:<20} {:<12} {:<20}",
                        id,
                        state.to_string(),
                        profile,
                        version,
                        installed
                    );
                }
            }
        }

        Commands::Status { instance_id } => {
            let state = daemon.state(&instance_id).await?;
            println!("{}", state);
        }
    }

    Ok(())
}
