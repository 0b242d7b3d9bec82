//! Service gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                  SERVICE GATEWAY                 │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ───────────────────┼─▶│  http   │──▶│ routing  │──▶│  forwarding  │───┼──▶ Backend
//!                      │  │ server  │   │  table   │   │ pipeline +   │   │    origin
//!   ◀──────────────────┼──│         │◀──│          │◀──│ dispatcher   │◀──┼───
//!   Client Response    │  └─────────┘   └──────────┘   └──────┬───────┘   │
//!                      │                                      │ 101       │
//!                      │                               ┌──────▼───────┐   │
//!                      │                               │   tunnels    │   │
//!                      │                               └──────────────┘   │
//!                      │  config · observability · resilience · lifecycle │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "Path-prefix gateway for backend services", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Validate configuration and route registration, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    service_gateway::lifecycle::bootstrap(&cli.config, cli.check).await?;
    Ok(())
}
