//! Configuration loading.
//!
//! Values come from an optional `config/default.{toml,yaml,json}` file and
//! from environment variables prefixed with `MQTTBIND_`, using `__` between
//! nested keys (`MQTTBIND_BROKER__PORT=8083`). Anything left unset falls back
//! to `Settings::default()`.

mod settings;

use config::{Config, Environment, File};

use crate::utils::error::Result;
use settings::PartialSettings;

pub use settings::{BrokerSettings, ClientSettings, LoggingSettings, Settings};

const DEFAULT_CONFIG_FILE: &str = "config/default";
const ENV_PREFIX: &str = "MQTTBIND";

/// Loads the configuration from the default file and environment variables.
pub fn load_config() -> Result<Settings> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Loads the configuration from `path` (extension optional, file optional)
/// and the environment, merged over the defaults.
pub fn load_config_from(path: &str) -> Result<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}
