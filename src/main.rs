use anyhow::Result;
use clap::Parser;
use tracing::info;

use mention_pulse::config;
use mention_pulse::engine::MetricsEngine;
use mention_pulse::server;

/// mention-pulse - sentiment analytics over social-media mention exports
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the semicolon-delimited dataset (overrides DATA_PATH)
    #[arg(short, long)]
    data: Option<String>,

    /// Address to serve on (overrides BIND_ADDR)
    #[arg(short, long)]
    bind: Option<String>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting mention-pulse");

    let args = Args::parse();
    let settings = config::resolve(args.data, args.bind);
    let engine = MetricsEngine::new(settings.data_path);

    let server = server::start_server(engine, &settings.bind_addr)?;
    server.await?;
    Ok(())
}
