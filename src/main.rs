use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use gitpulse::config::Args;
use gitpulse::routes::{AppState, router};
use gitpulse::store::EventStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let store = EventStore::connect(&args.database_url)
        .await
        .with_context(|| format!("failed to open event store at {}", args.database_url))?;

    if args.secret.is_some() {
        info!("webhook signature verification enabled");
    } else {
        warn!("no webhook secret configured - signatures will not be verified");
    }

    let app = router(AppState {
        store,
        webhook_secret: args.secret,
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("gitpulse listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
