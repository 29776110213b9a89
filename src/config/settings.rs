use serde::Deserialize;
use uuid::Uuid;

/// Top-level configuration settings for the application.
///
/// Includes the broker endpoint, tuning for the underlying MQTT client and
/// the logging level.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub client: ClientSettings,
    pub logging: LoggingSettings,
}

/// Where to connect and what to listen to.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String,
}

/// Tuning passed to the underlying MQTT client.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    pub keep_alive_secs: u64,
    /// Capacity of the request channel between the client handle and its
    /// event loop.
    pub request_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows a partial set of settings. Missing values are filled from
/// `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub client: Option<PartialClientSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialClientSettings {
    pub keep_alive_secs: Option<u64>,
    pub request_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            keep_alive_secs: 30,
            request_capacity: 10,
        }
    }
}

/// Provides default values for `Settings`.
///
/// The client id is unique per call so two processes started with no
/// configuration do not steal each other's broker session.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                host: "localhost".to_string(),
                port: 9002,
                client_id: format!("mqttbind-{}", Uuid::new_v4()),
                topic: "test".to_string(),
            },
            client: ClientSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Fills every value missing from `partial` with the defaults.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let broker = partial.broker.unwrap_or_default();
        let client = partial.client.unwrap_or_default();
        let logging = partial.logging.unwrap_or_default();

        Settings {
            broker: BrokerSettings {
                host: broker.host.unwrap_or(default.broker.host),
                port: broker.port.unwrap_or(default.broker.port),
                client_id: broker.client_id.unwrap_or(default.broker.client_id),
                topic: broker.topic.unwrap_or(default.broker.topic),
            },
            client: ClientSettings {
                keep_alive_secs: client
                    .keep_alive_secs
                    .unwrap_or(default.client.keep_alive_secs),
                request_capacity: client
                    .request_capacity
                    .unwrap_or(default.client.request_capacity),
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(default.logging.level),
            },
        }
    }
}
