use std::sync::Arc;

use casting_agency::{config::Opts, repository::InMemoryRepository};
use casting_auth::Authorizer;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    let config = opts.auth_config()?;
    let authorizer = Authorizer::from_config(&config)?;
    tracing::info!(
        issuer = %config.issuer(),
        audience = %config.audience(),
        jwks.url = %config.jwks_url(),
        "verifying tokens"
    );

    let app = casting_agency::app(Arc::new(InMemoryRepository::new()), authorizer);

    let listener = TcpListener::bind(opts.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
