use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use reservation_app::Role;
use reservation_kernel::{Settings, SharedSettings};

#[derive(Parser, Debug)]
#[command(name = "reservation", version, about = "Reservation gateway and backing service")]
struct Cli {
    /// Configuration environment (local, staging, production)
    #[arg(long, env = "RESERVATION_ENV", default_value = "local", global = true)]
    env: String,

    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, env = "RESERVATION_CONFIG_DIR", default_value = "config", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the API gateway; writes are relayed to `channel.relay_url`
    Gateway {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the backing reservation service
    Service {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run both servers in one process
    Standalone,
    /// Print the effective configuration as JSON
    Config,
}

fn load(config_dir: PathBuf, env: String) -> anyhow::Result<SharedSettings> {
    let _ = dotenvy::dotenv();

    let settings = Settings::load_from(&config_dir, &env)
        .with_context(|| format!("failed to load settings from {}", config_dir.display()))?;
    let loader = Arc::new(move || -> anyhow::Result<Settings> {
        Settings::load_from(&config_dir, &env)
    });
    Ok(SharedSettings::with_loader(settings, loader))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load(cli.config_dir, cli.env)?;

    let role = match cli.command {
        Command::Config => {
            let json = serde_json::to_string_pretty(&*settings.current())?;
            println!("{json}");
            return Ok(());
        }
        Command::Gateway { port } => {
            if let Some(port) = port {
                settings.update(|s| s.gateway.server.port = port);
            }
            Role::Gateway
        }
        Command::Service { port } => {
            if let Some(port) = port {
                settings.update(|s| s.service.server.port = port);
            }
            Role::Service
        }
        Command::Standalone => Role::Standalone,
    };

    reservation_telemetry::init(&settings.current().telemetry)?;
    tracing::info!(?role, "reservation cli starting");

    reservation_app::run(role, settings).await
}
