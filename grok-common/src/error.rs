//! Error type shared by the grok crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Seed fixture or stored keyword list that is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file that could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Seed fixture record that cannot be inserted as given
    #[error("Invalid seed data: {0}")]
    Seed(String),

    /// Value outside its closed set, such as an unknown difficulty
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(format!("Invalid config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_errors_become_config_errors() {
        let err: Error = toml::from_str::<toml::Value>("key = ").unwrap_err().into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: Invalid config"));
    }
}
