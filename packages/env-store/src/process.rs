//! The process environment as a store.

use std::env::{self, VarError};

use crate::{StoreError, VarReader, VarWriter};

/// Store backed by the environment of the current process.
///
/// Reads go through [`std::env::var`], writes through [`std::env::set_var`].
/// Keys are validated up front so that malformed keys surface as
/// [`StoreError::InvalidKey`] instead of a panic inside the standard library.
///
/// The environment is process-wide state: concurrent writers to the same key
/// race, and the last write wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn new() -> Self {
        Self
    }

    fn check_key(key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "empty key"));
        }
        if key.contains('=') {
            return Err(StoreError::invalid_key(key, "contains '='"));
        }
        if key.contains('\0') {
            return Err(StoreError::invalid_key(key, "contains NUL"));
        }
        Ok(())
    }
}

impl VarReader for ProcessEnv {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::check_key(key)?;
        match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(StoreError::NotUnicode {
                key: key.to_string(),
            }),
        }
    }
}

impl VarWriter for ProcessEnv {
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::check_key(key)?;
        if value.contains('\0') {
            return Err(StoreError::InvalidValue {
                key: key.to_string(),
                reason: "contains NUL",
            });
        }
        tracing::trace!(key, "setting environment variable");
        env::set_var(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        Self::check_key(key)?;
        tracing::trace!(key, "removing environment variable");
        env::remove_var(key);
        Ok(())
    }
}
