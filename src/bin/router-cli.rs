use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Diagnostics CLI for the replica router", long_about = None)]
struct Cli {
    #[arg(short, long, env = "ROUTER_URL", default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe both databases now
    Health,
    /// Show pool descriptors, health flags and the last routing decision
    DbInfo,
    /// List products (falls back to sample data when databases are down)
    Products,
    /// Process liveness with cached database health
    Status,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Health => "/api/health",
            Commands::DbInfo => "/api/db-info",
            Commands::Products => "/api/products",
            Commands::Status => "/health",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.get(url).send().await?;
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let served_by = ["x-db-role", "x-db-host", "x-db-latency-ms"]
        .iter()
        .filter_map(|h| res.headers().get(*h).and_then(|v| v.to_str().ok()).map(|v| format!("{h}: {v}")))
        .collect::<Vec<_>>();

    if !status.is_success() {
        eprintln!("Error: router returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    for line in served_by {
        eprintln!("{line}");
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
