//! Connects to the configured broker, subscribes to one topic and logs
//! every message until Ctrl-C or until the broker goes away.

use mqttbind::config::{Settings, load_config};
use mqttbind::utils::logging;
use mqttbind::{Connection, Registry, WebSocketClientFactory};
use tokio::sync::oneshot;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&config.logging.level);

    if let Err(e) = run(config).await {
        error!("mqttbind failed: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Settings) -> mqttbind::Result<()> {
    let broker = &config.broker;
    let registry = Registry::new(WebSocketClientFactory::new(config.client.clone()));
    let (lost_tx, lost_rx) = oneshot::channel();

    let connection = Connection::open(
        &registry,
        &broker.host,
        broker.port,
        &broker.client_id,
        |topic, payload| info!("{topic}: {payload}"),
        move |reason| {
            let _ = lost_tx.send(reason);
        },
    )
    .await?;

    connection.subscribe(&broker.topic).await?;
    info!(
        "listening on '{}' at {}:{} as {}",
        broker.topic, broker.host, broker.port, broker.client_id
    );

    tokio::select! {
        reason = lost_rx => {
            error!("connection lost: {}", reason.unwrap_or_default());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    connection.close();
    Ok(())
}
