use clap::Parser;
use eyre::Context;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_meme_api::config::Args;
use youtube_meme_api::server;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let args = Args::parse();
    let addr = args.listen_addr()?;
    let state = Arc::new(youtube_meme_api::setup(&args).await?);

    // a catalog that fails to load still serves; /api/v1/update/all retries
    match state.coordinator().load_all(args.refresh).await {
        Ok(outcomes) => {
            for outcome in outcomes {
                tracing::info!(kind = %outcome.kind, count = outcome.count, "loaded");
            }
        }
        Err(e) => tracing::warn!(error = %e, "initial catalog load failed"),
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind to {addr}"))?;
    server::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await
}
