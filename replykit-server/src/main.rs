use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use replykit_server::{AppConfig, AppState, ServerConfig, run_server};
use replykit_telemetry::{LogFormat, RequestTraceStore, init_with_recorder};

#[derive(Debug, Parser)]
#[command(name = "replykit", version, about = "Draft grounded replies to customer messages")]
struct Cli {
    /// Path to a TOML config file (defaults to ./replykit.toml if present).
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Log output format: pretty or json.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(format) = cli.log_format {
        config.telemetry.format = format;
    }

    let traces = Arc::new(RequestTraceStore::new(config.telemetry.trace_capacity));
    init_with_recorder(config.telemetry.format, traces.clone())
        .context("failed to initialise logging")?;

    config.validate().context("invalid configuration")?;
    let state = AppState::from_config(&config).await?.with_traces(traces);

    run_server(ServerConfig { host: config.server.host, port: config.server.port }, state).await
}
