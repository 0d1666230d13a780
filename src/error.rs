use thiserror::Error;

/// Unified error type for the sandcat policy library.
///
/// Only configuration loading and reload plumbing can fail. Request
/// evaluation never returns an error: deny and block are verdicts.
#[derive(Debug, Error)]
pub enum SandcatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Environment variable not set: {0}")]
    ConfigEnvVar(String),

    #[error("Invalid variable name {0:?}: expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidName(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, SandcatError>;
