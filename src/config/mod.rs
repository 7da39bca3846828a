mod settings;

pub use settings::{LogFormat, LoggingConfig, QueueSettings, Settings};
