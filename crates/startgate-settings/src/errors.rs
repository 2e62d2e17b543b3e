//! Settings errors.

use thiserror::Error;

/// Why settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file is not valid JSON or has the wrong shape.
    #[error("malformed settings file: {0}")]
    Json(#[from] serde_json::Error),
    /// A value parsed but is unusable, such as a zero message ceiling.
    #[error("invalid setting: {0}")]
    InvalidValue(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err = SettingsError::Json(json_err);
        assert!(err.to_string().starts_with("malformed settings file: "));
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("message ceiling must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "invalid setting: message ceiling must be at least 1"
        );
    }
}
