//! chat-relay - streaming reverse proxy for chat completion backends
//!
//! Routes OpenAI-style chat requests to a backend chosen by model name and
//! streams the reply back line by line.

use chat_relay::config::Config;
use chat_relay::registry::ModelRegistry;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(about = "Streaming reverse proxy for chat completion backends")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Serve {
        /// Path to configuration file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Show configured models and their endpoints
    Models {
        /// Path to configuration file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<String>,
    },
}

impl Commands {
    fn config_path(&self) -> Option<&str> {
        match self {
            Commands::Serve { config, .. }
            | Commands::Check { config }
            | Commands::Models { config } => config.as_deref(),
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("chat_relay={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Tracing needs the configured level, so the config is loaded first and
    // load errors are reported through anyhow. Validation logs nothing;
    // warnings are collected and emitted once the subscriber exists.
    let mut config = Config::load(cli.command.config_path())?;
    init_tracing(&config.logging.level);
    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }

    match cli.command {
        Commands::Serve { config: path, listen } => {
            tracing::info!(config = ?path, "Loaded configuration");

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            chat_relay::proxy::run_server(config).await
        }

        Commands::Check { config: path } => {
            tracing::info!(
                config = ?path,
                models = config.models.len(),
                listen = %config.server.listen,
                "Configuration is valid"
            );
            Ok(())
        }

        Commands::Models { .. } => {
            let registry = ModelRegistry::new(&config.models);
            if registry.is_empty() {
                println!("No models configured");
                return Ok(());
            }

            for id in registry.ids() {
                let entry = registry.lookup(id)?;
                println!("{:<10} {:<20} {:<16} {}", id, entry.name, entry.description, entry.endpoint);
            }
            Ok(())
        }
    }
}
