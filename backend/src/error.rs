use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{var}: cannot parse {value:?}")]
    Unparseable { var: &'static str, value: String },

    #[error("{var}: {reason}")]
    OutOfRange { var: &'static str, reason: String },
}
