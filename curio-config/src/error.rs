use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration rejected: {0}")]
    Invalid(String),

    #[error(transparent)]
    Source(#[from] config::ConfigError),
}
