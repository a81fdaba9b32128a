//! Core traits for the store layer.

use std::sync::Arc;

use crate::StoreError;

/// Read string values by key.
///
/// This is the only read interface the engine uses. Keys and values are
/// plain strings; an absent key is not an error.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `&dyn VarReader`.
pub trait VarReader: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The key is not set (not an error condition).
    /// * `Ok(Some(value))` - The value under the key.
    /// * `Err(StoreError)` - The key is invalid or the store failed.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Append the value stored under `key` to `buf`.
    ///
    /// Returns whether the key was present. Stores that hold their values in
    /// memory override this to skip the intermediate allocation.
    fn read_into(&self, key: &str, buf: &mut String) -> Result<bool, StoreError> {
        match self.read(key)? {
            Some(value) => {
                buf.push_str(&value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Write string values by key.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `&dyn VarWriter`.
pub trait VarWriter: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Combined read/write.
///
/// Automatically implemented for any type that implements both `VarReader`
/// and `VarWriter`.
pub trait VarStore: VarReader + VarWriter {}
impl<T: VarReader + VarWriter> VarStore for T {}

// Forwarding implementations for references and smart pointers

impl<T: VarReader + ?Sized> VarReader for &T {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn read_into(&self, key: &str, buf: &mut String) -> Result<bool, StoreError> {
        (**self).read_into(key, buf)
    }
}

impl<T: VarWriter + ?Sized> VarWriter for &T {
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<T: VarReader + ?Sized> VarReader for Box<T> {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.as_ref().read(key)
    }

    fn read_into(&self, key: &str, buf: &mut String) -> Result<bool, StoreError> {
        self.as_ref().read_into(key, buf)
    }
}

impl<T: VarWriter + ?Sized> VarWriter for Box<T> {
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.as_ref().write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.as_ref().remove(key)
    }
}

impl<T: VarReader + ?Sized> VarReader for Arc<T> {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.as_ref().read(key)
    }

    fn read_into(&self, key: &str, buf: &mut String) -> Result<bool, StoreError> {
        self.as_ref().read_into(key, buf)
    }
}

impl<T: VarWriter + ?Sized> VarWriter for Arc<T> {
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.as_ref().write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.as_ref().remove(key)
    }
}
