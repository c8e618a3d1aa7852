// Configuration loading

pub mod credentials;
pub mod error;
pub mod migrate;

pub use credentials::{resolve_token, Credential, TokenSource};
pub use error::ConfigError;
pub use migrate::{default_config_path, EndpointConfig, EndpointKind, ImportConfig, MigrateConfig};
