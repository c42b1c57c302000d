mod app;
mod commands;
mod config;
mod render;
mod scheduler;
mod state;
mod transport;
mod types;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "botwatch")]
#[command(author = "Trading Bot")]
#[command(version = "0.1.0")]
#[command(about = "Terminal dashboard client for the trading-bot server", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Server base URL (overrides the config file; ws URL is derived)
    #[arg(short, long)]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they do not tear the dashboard frames on stdout.
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Botwatch v0.1.0");

    let mut settings = config::load(std::path::Path::new(&cli.config))?;
    if let Some(server) = cli.server {
        settings.server.ws_url = derive_ws_url(&server);
        settings.server.base_url = server;
    }
    if let Err(errors) = settings.validate() {
        return Err(anyhow!("invalid configuration: {}", errors.join(", ")));
    }

    app::run(settings).await
}

fn derive_ws_url(base_url: &str) -> String {
    let ws = base_url
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    format!("{}/ws", ws.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_follows_server_override() {
        assert_eq!(derive_ws_url("http://bot.local:8080/"), "ws://bot.local:8080/ws");
        assert_eq!(derive_ws_url("https://bot.example"), "wss://bot.example/ws");
    }
}
