use thiserror::Error;

/// Top-level error type for the Shopkeep system.
///
/// Subsystem crates define their own error types and implement
/// `From<ShopkeepError>` so that the `?` operator works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShopkeepError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ShopkeepError {
    fn from(err: toml::de::Error) -> Self {
        ShopkeepError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ShopkeepError {
    fn from(err: toml::ser::Error) -> Self {
        ShopkeepError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ShopkeepError {
    fn from(err: serde_json::Error) -> Self {
        ShopkeepError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Shopkeep operations.
pub type Result<T> = std::result::Result<T, ShopkeepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(ShopkeepError, &str)> = vec![
            (
                ShopkeepError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                ShopkeepError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                ShopkeepError::Api("bind failed".to_string()),
                "API error: bind failed",
            ),
            (
                ShopkeepError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ShopkeepError = io_err.into();
        assert!(matches!(err, ShopkeepError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: ShopkeepError = err.unwrap_err().into();
        assert!(matches!(err, ShopkeepError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: ShopkeepError = err.unwrap_err().into();
        assert!(matches!(err, ShopkeepError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
