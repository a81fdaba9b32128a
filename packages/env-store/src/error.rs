//! Error types for the store layer.
//!
//! Errors at this level are about keys and transport only. Whether a missing
//! key is a problem, or whether a value parses, is decided by the engine.

/// Errors raised by a [`VarReader`](crate::VarReader) or
/// [`VarWriter`](crate::VarWriter).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key cannot be used with this store.
    ///
    /// The process environment rejects empty keys and keys containing `=`
    /// or NUL.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// The value cannot be stored under this key.
    ///
    /// The process environment rejects values containing NUL.
    #[error("invalid value for ${key}: {reason}")]
    InvalidValue { key: String, reason: &'static str },

    /// The stored value is not valid UTF-8.
    #[error("value of ${key} is not valid unicode")]
    NotUnicode { key: String },
}

impl StoreError {
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        StoreError::InvalidKey {
            key: key.into(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn invalid_key_display() {
        let e = StoreError::invalid_key("A=B", "contains '='");
        let display = e.to_string();
        assert!(display.contains("\"A=B\""));
        assert!(display.contains("contains '='"));
    }

    #[test]
    fn not_unicode_display() {
        let e = StoreError::NotUnicode {
            key: "APP_NAME".to_string(),
        };
        assert_eq!(e.to_string(), "value of $APP_NAME is not valid unicode");
    }

    #[test]
    fn invalid_value_names_key() {
        let e = StoreError::InvalidValue {
            key: "APP_NAME".to_string(),
            reason: "contains NUL",
        };
        assert_eq!(e.to_string(), "invalid value for $APP_NAME: contains NUL");
        assert!(StdError::source(&e).is_none());
    }
}
