use std::io::Read;

use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tvlink_skill::{BrokerPublisher, DirectiveTranslator, SkillConfig};

/// Reads one directive from stdin and writes its response to stdout
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the response
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = SkillConfig::from_env()?;
    info!(
        "Skill publishing to {} under {}",
        config.broker_address, config.topic_root
    );

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    debug!("REQUEST: {}", input);

    let publisher = BrokerPublisher::new(config.broker_address.clone(), config.publish_timeout);
    let translator = DirectiveTranslator::new(publisher, config.topic_root, config.descriptor);

    let response = serde_json::to_string(&translator.respond_raw(&input).await)?;
    debug!("RESPONSE: {}", response);
    println!("{}", response);

    Ok(())
}
