//! envio: move data between structs and environment variables
//!
//! A struct declared with [`record!`] binds each of its fields to a variable
//! name. [`Engine::get`] fills the struct from a store, parsing every value
//! into its field's type; [`Engine::set`] writes the fields back as strings.
//!
//! - Scalars: `bool`, all integer widths, `f32`/`f64`, `String`, `Vec<u8>`
//! - Nested records, either traversed as fields or `embedded` (their fields
//!   are bound as if declared in the enclosing record)
//! - `Option<T>` and `Box<T>`; an absent option is only filled on get if the
//!   store supplies a non-zero value for it
//! - [`DynValue`], for a field whose type is chosen at runtime
//!
//! The store is anything implementing [`VarStore`]: the process
//! environment ([`ProcessEnv`]) or an in-memory map ([`MemoryEnv`]).
//!
//! # Example
//!
//! ```rust
//! use envio::{Engine, Error, MemoryEnv};
//!
//! #[derive(Debug, Default)]
//! struct Config {
//!     port: u16,
//!     host: String,
//!     timeout: Option<u32>,
//! }
//!
//! envio::record!(Config {
//!     port: "APP_PORT",
//!     host: "APP_HOST" => required,
//!     timeout: "APP_TIMEOUT",
//! });
//!
//! let engine = Engine::new(MemoryEnv::from_pairs([("APP_PORT", "8080")]));
//!
//! let mut config = Config::default();
//! let err = engine.get(&mut config).unwrap_err();
//! assert!(matches!(err, Error::MissingRequired { key: "APP_HOST" }));
//! assert_eq!(config.port, 8080);
//! assert_eq!(config.timeout, None);
//! ```

mod cache;
mod config;
mod dispatch;
mod engine;
mod error;
mod getter;
mod record;
mod reflect;
mod setter;
mod state;

pub use cache::{FieldDescriptor, FieldDescriptorList};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ConvertError, Direction, Error};
pub use record::{FieldMeta, Record};
pub use reflect::{
    DynValue, FloatNum, Kind, OptionalValue, Reflect, Shape, SignedInt, Typed, UnsignedInt,
    ValueMut, ValueRef,
};

// Re-export the store layer for convenience
pub use envio_store::{MemoryEnv, ProcessEnv, StoreError, VarReader, VarStore, VarWriter};

lazy_static::lazy_static! {
    static ref DEFAULT_ENGINE: Engine<ProcessEnv> = Engine::new(ProcessEnv);
}

/// The process-wide engine used by [`get`] and [`set`].
pub fn default_engine() -> &'static Engine<ProcessEnv> {
    &DEFAULT_ENGINE
}

/// Populate `value` from the process environment.
pub fn get<T: Record>(value: &mut T) -> Result<(), Error> {
    DEFAULT_ENGINE.get(value)
}

/// Write `value` to the process environment.
pub fn set<T: Record>(value: &T) -> Result<(), Error> {
    DEFAULT_ENGINE.set(value)
}
