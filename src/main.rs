use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use estate_gateway::{config::Config, crypto, server, telemetry};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "estate-gateway", version, about = "Estate planning web gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway (default)
    Serve,
    /// Encrypt a file into a sealed JSON envelope
    Seal {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, env = "VAULT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Decrypt a sealed JSON envelope back into the original file
    Unseal {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, env = "VAULT_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Seal {
            input,
            output,
            password,
        } => {
            crypto::seal_file(&input, &output, &password)?;
            println!("Sealed {} -> {}", input.display(), output.display());
            Ok(())
        }
        Commands::Unseal {
            input,
            output,
            password,
        } => {
            crypto::unseal_file(&input, &output, &password)?;
            println!("Unsealed {} -> {}", input.display(), output.display());
            Ok(())
        }
    }
}

async fn serve() -> Result<()> {
    let config = Config::from_env()?;
    let metrics_handle = telemetry::init(&config.telemetry)?;

    info!("Starting Estate Gateway");
    info!("HTTP server listening on {}", config.http_addr());

    server::run(config, metrics_handle).await
}
