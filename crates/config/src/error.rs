use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Invalid(String),

    #[error("config has no [{0}] section")]
    MissingSection(&'static str),

    #[error("no credentials for {endpoint}")]
    MissingCredentials {
        endpoint: String,
        /// Environment variable that would have been consulted, if any.
        env_var: Option<String>,
    },
}
