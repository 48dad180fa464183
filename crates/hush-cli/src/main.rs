//! Hush CLI - Configuration checks and an in-memory simulator

mod config;
mod simulate;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hush")]
#[command(about = "Hush - strips chat attestation from game server traffic", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Load and validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "hush.yml")]
        config: PathBuf,
    },
    /// Print the default configuration as YAML
    Defaults,
    /// Run the engine against an in-memory host
    Simulate {
        /// Configuration file path
        #[arg(short, long, default_value = "hush.yml")]
        config: PathBuf,
        /// Simulated connections
        #[arg(long, default_value_t = 8)]
        connections: usize,
        /// Messages pushed per connection
        #[arg(long, default_value_t = 60)]
        messages: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Some(Commands::Check { config }) => {
            let loaded = config::load(&config)?;
            println!("{} is valid\n{loaded}", config.display());
        }
        Some(Commands::Defaults) => {
            print!("{}", config::defaults_yaml()?);
        }
        Some(Commands::Simulate {
            config,
            connections,
            messages,
        }) => {
            let loaded = config::load(&config)?;
            let report = simulate::run(loaded, connections, messages).await?;
            println!(
                "connections: {}, messages per connection: {}, delivered: {}, kicks cancelled: {}",
                report.connections, report.messages, report.delivered, report.kicks_cancelled
            );
            println!("{}", report.diagnostics);
        }
        None => {
            println!("Hush v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
