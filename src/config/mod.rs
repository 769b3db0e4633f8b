//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, ChainsConfig, ExecutionConfig, LogFormat, LoggingConfig,
    MetricsConfig, ServerConfig, StorageSettings,
};
