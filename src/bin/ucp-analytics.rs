//! Operational CLI: print DDL, initialize the event table, or record a
//! single event from the command line.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;

use ucp_analytics::config::{Config, TrackerConfig};
use ucp_analytics::event::Transport;
use ucp_analytics::sink::{PostgresSink, SCHEMA, Sink, ddl};
use ucp_analytics::telemetry::init_tracing;
use ucp_analytics::tracker::{HttpExchange, RpcCall, Tracker};

#[derive(Parser)]
#[command(name = "ucp-analytics", about = "UCP analytics operations", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the event table DDL and exit.
    Ddl {
        /// Table name (default: UCP_ANALYTICS_TABLE or ucp_events).
        #[arg(long)]
        table: Option<String>,
    },
    /// Create the event table and indexes in the configured database.
    Init,
    /// Classify and record a single event.
    Record {
        #[command(subcommand)]
        source: RecordSource,
    },
}

#[derive(Subcommand)]
enum RecordSource {
    /// Record an HTTP exchange.
    Http {
        method: String,
        path: String,
        #[arg(long, default_value_t = 200)]
        status: u16,
        /// Response body as JSON.
        #[arg(long)]
        response_body: Option<String>,
        /// Request body as JSON.
        #[arg(long)]
        request_body: Option<String>,
    },
    /// Record a JSON-RPC tool call.
    Rpc {
        tool_name: String,
        #[arg(long, default_value = "mcp")]
        transport: String,
        #[arg(long, default_value_t = 200)]
        status: u16,
        /// Response body as JSON.
        #[arg(long)]
        response_body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ddl { table } => {
            let table = table
                .or_else(|| std::env::var("UCP_ANALYTICS_TABLE").ok())
                .unwrap_or_else(|| "ucp_events".to_owned());
            print!("{}", ddl(&table, SCHEMA));
        }
        Commands::Init => {
            let config = Config::from_env()?;
            init_tracing(&config.log_level)?;
            let sink = PostgresSink::connect(config.database_url.expose_secret()).await?;
            sink.health_check().await?;
            sink.ensure_table(&config.table, SCHEMA).await?;
            println!("table {} ready", config.table);
        }
        Commands::Record { source } => {
            let config = Config::from_env()?;
            init_tracing(&config.log_level)?;
            let sink = PostgresSink::connect(config.database_url.expose_secret()).await?;
            let tracker = Tracker::new(
                Arc::new(sink),
                TrackerConfig::default()
                    .app_name(config.app_name)
                    .table(config.table),
            );
            let event = match source {
                RecordSource::Http {
                    method,
                    path,
                    status,
                    response_body,
                    request_body,
                } => {
                    let mut exchange = HttpExchange::new(method, status).path(path);
                    if let Some(body) = response_body {
                        exchange = exchange
                            .response_body(parse_json(&body).context("invalid response body")?);
                    }
                    if let Some(body) = request_body {
                        exchange = exchange
                            .request_body(parse_json(&body).context("invalid request body")?);
                    }
                    tracker.record_http(exchange).await
                }
                RecordSource::Rpc {
                    tool_name,
                    transport,
                    status,
                    response_body,
                } => {
                    let transport = Transport::parse(&transport)
                        .with_context(|| format!("unknown transport: {transport}"))?;
                    let mut call = RpcCall::new(tool_name)
                        .transport(transport)
                        .status_code(status);
                    if let Some(body) = response_body {
                        call = call
                            .response_body(parse_json(&body).context("invalid response body")?);
                    }
                    tracker.record_jsonrpc(call).await
                }
            };
            tracker.close().await;
            println!("{} {}", event.event_type, event.event_id);
        }
    }
    Ok(())
}

fn parse_json(s: &str) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::from_str(s)?)
}
