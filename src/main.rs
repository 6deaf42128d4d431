use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tv_bridge::command::{CommandExecutor, CommandResult, CommandSequencer, PlanScheduler};
use tv_bridge::config::BridgeConfig;
use tv_bridge::connection::{ConnectionConfig, ConnectionEvent, ConnectionManager};
use tv_bridge::remote::{BraviaRemote, RemoteControl};
use tv_bridge::transport::TcpConnector;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = BridgeConfig::from_env()?;
    let topic = config.topic();

    info!("TV bridge starting: {} ({})", config.device_id, config.device_name);
    info!("  TV: {}", config.tv_address);
    info!("  Broker: {}", config.broker_address);
    info!("  Topic: {}", topic);
    info!("  Mapped inputs: {}", config.inputs.len());

    let remote: Arc<dyn RemoteControl> = Arc::new(BraviaRemote::new(
        &config.tv_address,
        config.tv_psk.clone(),
        config.remote_timeout,
    )?);
    info!("Remote control session ready ({})", remote.name());

    let executor = CommandExecutor::new(
        CommandSequencer::new(config.device_name.clone(), config.inputs.clone()),
        PlanScheduler::new(remote),
    );

    let mut conn = ConnectionManager::new(
        TcpConnector::new(config.broker_address.clone())
            .with_connect_timeout(config.broker_connect_timeout),
        ConnectionConfig::new(topic.clone()),
    );

    // Main event loop
    loop {
        match conn.recv().await {
            Some(ConnectionEvent::Connected { transport }) => {
                info!("Connected via {}, subscribed to {}", transport, conn.topic());
            }
            Some(ConnectionEvent::Disconnected { reason }) => {
                warn!("Disconnected: {}", reason);
            }
            Some(ConnectionEvent::ConnectionFailed { reason }) => {
                error!("Connection failed: {}", reason);
            }
            Some(ConnectionEvent::Received { topic: from, payload }) => {
                if from != topic {
                    warn!("Ignoring message for foreign topic {}", from);
                    continue;
                }
                debug!("Received on {}: {}", from, payload);

                // Steps run on their own timers; the loop never waits for them
                if let CommandResult::Scheduled { steps, .. } = executor.execute(&payload) {
                    debug!("{} step(s) in flight", steps);
                }
            }
            None => {
                error!("Connection manager closed");
                break;
            }
        }
    }

    Ok(())
}
