mod broker;
mod session;

use session::SessionManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let bind = std::env::var("BROKER_BIND").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let listener = TcpListener::bind(&bind).await?;
    info!("Broker listening on {}", bind);

    let manager = Arc::new(SessionManager::new());
    tokio::spawn(broker::sweep_dead_sessions(manager.clone()));

    broker::serve(listener, manager).await
}
