//! Subtext Gateway Binary
//!
//! Standalone HTTP server for message analysis.
//!
//! # Usage
//! ```bash
//! subtext-gateway [--port 8787] [--host 127.0.0.1] [--verbose] [--dev-details]
//! ```

use clap::Parser;
use std::sync::Arc;

use subtext_engine::{AnalysisPipeline, GeminiOracle, OracleConfig};
use subtext_gateway::{Gateway, GatewayConfig};

/// Subtext Gateway - structured communication analysis over HTTP
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (default: 8787)
    #[arg(short, long, default_value = "8787")]
    port: u16,

    /// Host to bind to (default: 127.0.0.1)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Include internal error detail in failure responses (never in prod)
    #[arg(long)]
    dev_details: bool,

    /// Allowed CORS origin, repeatable. Overrides the built-in list.
    #[arg(long = "allow-origin")]
    allow_origins: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; the environment itself may carry the key.
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .init();
    }

    // Read once at startup; the oracle config is immutable for the process
    // lifetime.
    let oracle_config = OracleConfig::from_env()?;
    let oracle = GeminiOracle::from_config(&oracle_config)?;
    let pipeline = AnalysisPipeline::new(Arc::new(oracle));

    let mut config = GatewayConfig::default()
        .with_host(args.host.clone())
        .with_port(args.port)
        .with_error_details(args.dev_details);
    if !args.allow_origins.is_empty() {
        config = config.with_allowed_origins(args.allow_origins);
    }

    print_banner(&args.host, args.port, &oracle_config.model);

    let gateway = Gateway::new(config, pipeline);
    gateway.start().await?;

    Ok(())
}

fn print_banner(host: &str, port: u16, model: &str) {
    println!();
    println!("  Subtext Gateway");
    println!("  ───────────────");
    println!("  🔗 http://{}:{}", host, port);
    println!();
    println!("  Endpoints");
    println!("   ├─ POST /analyze/text — run an analysis");
    println!("   ├─ GET  /health       — liveness probe");
    println!("   ├─ GET  /status       — uptime metadata");
    println!("   └─ GET  /             — banner");
    println!();
    println!("  Oracle model: {}", model);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();
}
