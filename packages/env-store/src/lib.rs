//! envio-store: the key-value layer under envio.
//!
//! Everything at this level is a flat map from string keys to string values.
//! There are no types, no records, no conversions - those belong to the
//! `envio` crate, which only talks to a store through [`VarReader`] and
//! [`VarWriter`].
//!
//! Two stores ship with the crate:
//! - [`ProcessEnv`]: the environment of the current process
//! - [`MemoryEnv`]: a private map, for tests and for embedding
//!
//! # Example
//!
//! ```rust
//! use envio_store::{MemoryEnv, VarReader, VarWriter};
//!
//! let store = MemoryEnv::new();
//! store.write("APP_PORT", "8080").unwrap();
//!
//! assert_eq!(store.read("APP_PORT").unwrap(), Some("8080".to_string()));
//! assert_eq!(store.read("APP_HOST").unwrap(), None);
//! ```

mod error;
mod memory;
mod process;
mod traits;

pub use error::StoreError;
pub use memory::MemoryEnv;
pub use process::ProcessEnv;
pub use traits::{VarReader, VarStore, VarWriter};
