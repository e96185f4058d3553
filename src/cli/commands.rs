use anyhow::Context;
use clap::{Parser, Subcommand};
use http::Method;
use std::path::PathBuf;

use super::demo::bind_demo;
use crate::config::ServerConfig;
use crate::logging::{init_logging_with_config, LogConfig};
use crate::server::{HandlerRequest, Server};

/// Command-line interface for objroute
#[derive(Parser)]
#[command(name = "objroute")]
#[command(about = "Inspect and exercise object-bound routes", long_about = None)]
pub struct Cli {
    /// Server configuration file (YAML or JSON)
    #[arg(short, long, global = true, env = "OBJR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pretty debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the route table of the demo service objects
    Routes,
    /// Dispatch requests to a route and print the last response
    Call {
        /// HTTP method
        method: String,
        /// Request target, e.g. `/user/show?name=ada`
        target: String,
        /// Host header used for domain routing
        #[arg(long, default_value = "")]
        host: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// Send the request this many times
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },
}

/// Build the demo server for a CLI invocation.
pub fn demo_server(config: Option<&PathBuf>) -> anyhow::Result<Server> {
    let config = match config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ServerConfig::from_env(),
    };
    let server = Server::with_config(config);
    bind_demo(&server)?;
    Ok(server)
}

/// Render the route table, one route per line.
pub fn format_routes(server: &Server) -> String {
    server
        .router()
        .routes()
        .iter()
        .map(|route| format!("{:<40} {} [{}]", route.key.to_string(), route.name, route.source))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::from_env()
    };
    let _log_guard = init_logging_with_config(&log_config)?;

    let server = demo_server(cli.config.as_ref())?;
    match cli.command {
        Commands::Routes => {
            println!("{}", format_routes(&server));
        }
        Commands::Call {
            method,
            target,
            host,
            body,
            repeat,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method '{method}'"))?;
            let body: Option<serde_json::Value> = body
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("request body is not valid JSON")?;

            let mut last = None;
            for _ in 0..repeat.max(1) {
                let mut req = HandlerRequest::new(method.clone(), &target).with_host(&host);
                if let Some(body) = &body {
                    req = req.with_body(body.clone());
                }
                last = Some(server.handle(&mut req));
            }
            if let Some(resp) = last {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            println!("{}", serde_json::to_string_pretty(&server.pools().metrics())?);
        }
    }
    server.shutdown();
    Ok(())
}
