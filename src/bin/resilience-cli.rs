use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "resilience-cli")]
#[command(about = "Management CLI for the service resilience daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "RESILIENCE_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check daemon status
    Status,
    /// List every circuit
    Circuits,
    /// Show one circuit
    Circuit { name: String },
    /// Force a circuit open
    Open { name: String },
    /// Force a circuit closed
    Close { name: String },
    /// Aggregate circuit breaker statistics
    Stats,
    /// List instance pools
    Services,
    /// Show one service's pool
    Service { name: String },
    /// Set an instance's health flag
    Health {
        service: String,
        id: String,
        #[arg(action = clap::ArgAction::Set)]
        healthy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path, body) = match cli.command {
        Commands::Status => (Method::GET, "/admin/status".to_string(), None),
        Commands::Circuits => (Method::GET, "/admin/circuits".to_string(), None),
        Commands::Circuit { name } => (Method::GET, format!("/admin/circuits/{}", name), None),
        Commands::Open { name } => (Method::POST, format!("/admin/circuits/{}/open", name), None),
        Commands::Close { name } => (Method::POST, format!("/admin/circuits/{}/close", name), None),
        Commands::Stats => (Method::GET, "/admin/circuits/stats".to_string(), None),
        Commands::Services => (Method::GET, "/admin/services".to_string(), None),
        Commands::Service { name } => (Method::GET, format!("/admin/services/{}", name), None),
        Commands::Health { service, id, healthy } => (
            Method::POST,
            format!("/admin/services/{}/instances/{}/health", service, id),
            Some(json!({ "healthy": healthy })),
        ),
    };

    let mut request = client
        .request(method, format!("{}{}", cli.url, path))
        .headers(headers);
    if let Some(body) = body {
        request = request.json(&body);
    }

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("OK ({})", status);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
