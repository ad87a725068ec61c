use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;

use prefix_proxy::config::{load_config, ConfigError};
use prefix_proxy::lifecycle::startup::{describe_reload, describe_routes, mask_credentials};
use prefix_proxy::routing::{self, RouteMode};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the prefix proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print its route table
    Check {
        config: PathBuf,
    },
    /// Show where a request path would be forwarded
    Resolve {
        config: PathBuf,
        /// Request path, optionally with a query string
        path: String,
    },
    /// Query a running proxy's info endpoint
    Status {
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => check(&config)?,
        Commands::Resolve { config, path } => resolve(&config, &path)?,
        Commands::Status { url } => {
            let client = reqwest::Client::builder().no_proxy().build()?;
            let res = client.get(format!("{}/", url.trim_end_matches('/'))).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn check(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            eprintln!("{}: {} problem(s) found", path.display(), errors.len());
            for error in &errors {
                eprintln!("  - {}", error);
            }
            return Err("invalid configuration".into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}: OK", path.display());
    println!("  listen:      http://{}", config.server.bind_address());
    println!("  base path:   {}", display_or(config.server.base_path.as_str(), "(none)"));
    println!("  reload:      {}", describe_reload(&config.server));
    println!("  routes:");
    let lines = describe_routes(&config);
    if lines.is_empty() {
        println!("    (none)");
    }
    for line in lines {
        println!("    {}", line);
    }
    Ok(())
}

fn resolve(path: &Path, request: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let (raw_path, raw_query) = match request.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (request, None),
    };

    let resolution = match routing::resolve(raw_path, raw_query, &config) {
        Ok(resolution) => resolution,
        Err(e) => {
            eprintln!("{} {}", e.status_code(), e);
            return Err("request would be rejected".into());
        }
    };
    let route = resolution.route;

    println!("route:      {}", resolution.route_key);
    println!(
        "mode:       {}",
        match resolution.mode {
            RouteMode::Standard => "standard",
            RouteMode::Universal => "universal",
        }
    );
    println!("target:     {}", resolution.final_url);
    if let Some(params) = &resolution.query_params {
        for (name, value) in params {
            println!("query:      {}={}", name, value);
        }
    }
    println!(
        "proxy:      {}",
        route
            .proxy
            .resolve(config.global_proxy.as_deref())
            .map(mask_credentials)
            .unwrap_or_else(|| "direct".to_string())
    );
    println!(
        "overwrite:  {}",
        route.force_header_overwrite.resolve(config.force_header_overwrite)
    );
    for (name, value) in &route.custom_headers {
        println!("header:     {}: {}", name, value);
    }
    Ok(())
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
