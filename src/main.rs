#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use race_coordinator::config;
use race_coordinator::logging;
use race_coordinator::persistence::InMemoryPersistence;
use race_coordinator::websocket;

/// Realtime WebSocket coordinator for multiplayer typing races.
#[derive(Parser, Debug)]
#[command(name = "race-coordinator")]
#[command(about = "A lightweight, in-memory WebSocket coordinator for multiplayer typing races")]
#[command(version)]
struct Cli {
    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long)]
    print_config: bool,

    /// CORS origins to allow, comma-separated, or "*" for any origin.
    #[arg(long, env = "RACE_COORDINATOR_CORS_ORIGINS", default_value = "*")]
    cors_origins: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let cors_origins = cli.cors_origins.clone();
    let persistence = Arc::new(InMemoryPersistence::new());

    websocket::run_server(addr, cfg, persistence, cors_origins).await
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["race-coordinator"]).unwrap();
        assert!(!cli.print_config);
        assert_eq!(cli.cors_origins, "*");
    }

    #[test]
    fn test_cli_print_config() {
        let cli = Cli::try_parse_from(["race-coordinator", "--print-config"]).unwrap();
        assert!(cli.print_config);
    }

    #[test]
    fn test_cli_cors_origins() {
        let cli = Cli::try_parse_from([
            "race-coordinator",
            "--cors-origins",
            "https://example.com",
        ])
        .unwrap();
        assert_eq!(cli.cors_origins, "https://example.com");
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["race-coordinator", "--version"]);
        assert!(result.is_err());
    }
}
