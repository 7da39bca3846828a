use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::queue::OverflowPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// Storage backend name; only "memory" is implemented
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Maximum messages per receiver (0 = unbounded)
    #[serde(default)]
    pub max_size_per_receiver: usize,
    /// Policy applied when a bounded queue is full
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_backend() -> String {
    "memory".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("queue.backend", "memory")?
            .set_default("queue.max_size_per_receiver", 0)?
            .set_default("queue.overflow_policy", "reject")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // AMQ_QUEUE__MAX_SIZE_PER_RECEIVER, AMQ_LOGGING__FORMAT, etc.
            .add_source(
                Environment::with_prefix("AMQ")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            max_size_per_receiver: 0,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}
