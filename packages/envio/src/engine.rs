//! The engine: cache, pool and store behind the get/set entry points.

use std::sync::Arc;

use envio_store::{ProcessEnv, VarStore};

use crate::cache::{DescriptorCache, FieldDescriptorList};
use crate::config::EngineConfig;
use crate::dispatch::{DispatchTable, DISPATCH};
use crate::error::Error;
use crate::getter::Getter;
use crate::record::Record;
use crate::reflect::{Kind, Reflect, Typed};
use crate::setter::Setter;
use crate::state::StatePool;

/// Moves data between records and a variable store.
///
/// An engine is cheap to share: every method takes `&self`, and calls from
/// any number of threads may run at once. Field descriptors are built the
/// first time a record type is seen and reused afterwards.
///
/// # Example
///
/// ```rust
/// use envio::{Engine, MemoryEnv};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Server {
///     host: String,
///     port: u16,
/// }
///
/// envio::record!(Server {
///     host: "HOST" => required,
///     port: "PORT",
/// });
///
/// let engine = Engine::new(MemoryEnv::new());
/// engine
///     .set(&Server {
///         host: "localhost".to_string(),
///         port: 8080,
///     })
///     .unwrap();
///
/// let mut server = Server::default();
/// engine.get(&mut server).unwrap();
/// assert_eq!(server.port, 8080);
/// ```
pub struct Engine<S = ProcessEnv> {
    store: S,
    cache: DescriptorCache,
    pool: StatePool,
    table: &'static DispatchTable,
    config: EngineConfig,
}

impl<S: VarStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Engine {
            store,
            cache: DescriptorCache::new(&DISPATCH),
            pool: StatePool::new(config.pool_capacity),
            table: &DISPATCH,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Populate `value` from the store.
    ///
    /// Absent or empty keys leave their fields untouched, unless the field
    /// is mandatory. On error, fields converted before the failure keep
    /// their new values.
    pub fn get<T: Record>(&self, value: &mut T) -> Result<(), Error> {
        self.get_value(value)
    }

    /// Write every bound field of `value` to the store.
    ///
    /// Mandatory fields holding their zero value are skipped.
    pub fn set<T: Record>(&self, value: &T) -> Result<(), Error> {
        self.set_value(value)
    }

    /// [`get`](Engine::get) for a value whose type is only known at runtime.
    pub fn get_value(&self, value: &mut dyn Reflect) -> Result<(), Error> {
        let shape = value.shape();
        if shape.kind() != Kind::Record {
            return Err(Error::NotARecord {
                type_name: shape.type_name(),
            });
        }
        tracing::trace!(record = shape.type_name(), "get");

        let mut ctx = self.pool.acquire();
        Getter::new(&self.store, &self.cache, self.table, &mut ctx).run(value)
    }

    /// [`set`](Engine::set) for a value whose type is only known at runtime.
    pub fn set_value(&self, value: &dyn Reflect) -> Result<(), Error> {
        let shape = value.shape();
        if shape.kind() != Kind::Record {
            return Err(Error::NotARecord {
                type_name: shape.type_name(),
            });
        }
        tracing::trace!(record = shape.type_name(), "set");

        let mut ctx = self.pool.acquire();
        Setter::new(&self.store, &self.cache, self.table, &mut ctx).run(value)
    }

    /// The field descriptors resolved for `T`.
    pub fn descriptors<T: Record + Typed>(&self) -> Arc<FieldDescriptorList> {
        self.cache.descriptors_for(&T::type_shape())
    }

    /// Number of record types with resolved descriptors.
    pub fn cached_types(&self) -> usize {
        self.cache.len()
    }

    /// Number of idle pooled contexts.
    pub fn idle_contexts(&self) -> usize {
        self.pool.idle()
    }
}

impl<S: VarStore + Default> Default for Engine<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use envio_store::MemoryEnv;

    use super::*;
    use crate::reflect::DynValue;

    #[derive(Debug, Default, PartialEq)]
    struct Account {
        name: String,
        quota: u64,
    }

    crate::record!(Account {
        name: "ACCOUNT_NAME" => required,
        quota: "ACCOUNT_QUOTA",
    });

    #[test]
    fn root_must_be_a_record() {
        let engine = Engine::new(MemoryEnv::new());

        let mut n = 5u32;
        assert!(matches!(
            engine.get_value(&mut n),
            Err(Error::NotARecord { type_name: "u32" })
        ));

        let opt: Option<Account> = None;
        assert!(matches!(
            engine.set_value(&opt),
            Err(Error::NotARecord { .. })
        ));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn boxed_record_is_a_record() {
        let engine = Engine::new(MemoryEnv::from_pairs([("ACCOUNT_NAME", "ops")]));
        let mut boxed = Box::new(Account::default());
        engine.get_value(&mut boxed).unwrap();
        assert_eq!(boxed.name, "ops");
    }

    #[test]
    fn dynamic_entry_points_accept_trait_objects() {
        let engine = Engine::new(MemoryEnv::new());
        let account: Box<dyn Reflect> = Box::new(Account {
            name: "ops".to_string(),
            quota: 10,
        });
        engine.set_value(account.as_ref()).unwrap();

        let mut held = DynValue::new(Account::default());
        let target = held.get_mut().unwrap();
        engine.get_value(target).unwrap();
        assert_eq!(
            held.downcast_ref::<Account>(),
            Some(&Account {
                name: "ops".to_string(),
                quota: 10,
            })
        );
    }

    #[test]
    fn contexts_return_to_the_pool() {
        let engine = Engine::with_config(
            MemoryEnv::new(),
            EngineConfig::default().with_pool_capacity(1),
        );
        assert_eq!(engine.config().pool_capacity, 1);
        assert_eq!(engine.idle_contexts(), 0);

        assert!(engine.get(&mut Account::default()).is_err());
        assert_eq!(engine.idle_contexts(), 1);

        engine.set(&Account::default()).unwrap();
        assert_eq!(engine.idle_contexts(), 1);
    }

    #[test]
    fn descriptors_are_cached_per_engine() {
        let engine = Engine::new(MemoryEnv::new());
        assert_eq!(engine.cached_types(), 0);

        let list = engine.descriptors::<Account>();
        assert_eq!(list.keys(), ["ACCOUNT_NAME", "ACCOUNT_QUOTA"]);
        assert_eq!(engine.cached_types(), 1);

        engine.set(&Account::default()).unwrap();
        assert_eq!(engine.cached_types(), 1);
    }

    #[test]
    fn error_names_the_innermost_record() {
        #[derive(Debug, Default)]
        struct Outer {
            account: Account,
        }

        crate::record!(Outer { account });

        let engine = Engine::new(MemoryEnv::from_pairs([
            ("ACCOUNT_NAME", "ops"),
            ("ACCOUNT_QUOTA", "lots"),
        ]));
        let err = engine.get(&mut Outer::default()).unwrap_err();
        assert!(matches!(err, Error::Convert { record: "Account", .. }));
    }
}
