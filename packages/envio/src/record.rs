//! Records and their field metadata.
//!
//! A record is a struct whose fields are bound to store keys. The binding
//! (key name, mandatory flag, embedding) is declared once with [`record!`]
//! and resolved into [`FieldMeta`]; the engine never parses declarations
//! itself.
//!
//! [`record!`]: crate::record!

use crate::reflect::{Reflect, Shape, Typed};

/// A composite value: an ordered set of fields, each reachable by index.
pub trait Record: Reflect {
    /// Metadata for every field, in declaration order.
    ///
    /// The position in the returned list is the index accepted by
    /// [`field`](Record::field) and [`field_mut`](Record::field_mut).
    fn fields() -> Vec<FieldMeta>
    where
        Self: Sized;

    fn field(&self, index: usize) -> Option<&dyn Reflect>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;
}

/// Resolved metadata for one field of a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    name: &'static str,
    key: &'static str,
    mandatory: bool,
    embedded: bool,
    shape: Shape,
}

impl FieldMeta {
    /// Metadata for a field of type `T` bound to `key`.
    pub fn new<T: Typed>(name: &'static str, key: &'static str) -> Self {
        FieldMeta {
            name,
            key,
            mandatory: false,
            embedded: false,
            shape: T::type_shape(),
        }
    }

    /// Like [`new`](FieldMeta::new), with the field type taken from an
    /// accessor. Used by `record!`, which cannot name field types.
    pub fn of<R, T: Typed>(name: &'static str, key: &'static str, _field: fn(&R) -> &T) -> Self {
        Self::new::<T>(name, key)
    }

    /// The key must be present (and non-empty) in the store.
    pub fn required(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// The field is a record whose fields are bound as if they were declared
    /// in the enclosing record.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }
}

/// Declare a struct as a record.
///
/// Each entry names a field, optionally followed by `: "KEY"` (the store
/// key, defaulting to the field name) and `=> flags`, where flags are any of
/// `required` and `embedded`. Every field of the struct that should be bound
/// must be listed; unlisted fields are ignored by the engine and do not take
/// part in the zero-value check.
///
/// The struct must implement `Default`, which provides its zero value.
///
/// ```rust
/// #[derive(Debug, Default, PartialEq)]
/// struct Database {
///     url: String,
///     pool: u32,
/// }
///
/// envio::record!(Database {
///     url: "DATABASE_URL" => required,
///     pool: "DATABASE_POOL",
/// });
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Config {
///     port: u16,
///     debug: bool,
///     db: Database,
/// }
///
/// envio::record!(Config {
///     port: "PORT",
///     debug,
///     db => embedded,
/// });
///
/// let engine = envio::Engine::new(envio::MemoryEnv::from_pairs([
///     ("PORT", "8080"),
///     ("debug", "true"),
///     ("DATABASE_URL", "postgres://localhost/app"),
/// ]));
///
/// let mut config = Config::default();
/// engine.get(&mut config).unwrap();
/// assert_eq!(config.port, 8080);
/// assert!(config.debug);
/// assert_eq!(config.db.url, "postgres://localhost/app");
/// ```
#[macro_export]
macro_rules! record {
    (@key $field:ident) => {
        stringify!($field)
    };
    (@key $field:ident $key:literal) => {
        $key
    };
    ($ty:ident { $( $field:ident $(: $key:literal)? $(=> $($flag:ident)+)? ),* $(,)? }) => {
        impl $crate::Reflect for $ty {
            fn shape(&self) -> $crate::Shape {
                <$ty as $crate::Typed>::type_shape()
            }

            fn is_zero(&self) -> bool {
                true $(&& $crate::Reflect::is_zero(&self.$field))*
            }

            fn value(&self) -> $crate::ValueRef<'_> {
                $crate::ValueRef::Record(self)
            }

            fn value_mut(&mut self) -> $crate::ValueMut<'_> {
                $crate::ValueMut::Record(self)
            }
        }

        impl $crate::Typed for $ty {
            fn type_shape() -> $crate::Shape {
                $crate::Shape::record::<$ty>(stringify!($ty))
            }
        }

        impl $crate::Record for $ty {
            fn fields() -> ::std::vec::Vec<$crate::FieldMeta> {
                ::std::vec![$(
                    $crate::FieldMeta::of(
                        stringify!($field),
                        $crate::record!(@key $field $($key)?),
                        |r: &$ty| &r.$field,
                    )$($(.$flag())+)?
                ),*]
            }

            #[allow(unused_mut, unused_assignments)]
            fn field(&self, index: usize) -> ::std::option::Option<&dyn $crate::Reflect> {
                let mut i = 0usize;
                $(
                    if index == i {
                        return ::std::option::Option::Some(&self.$field);
                    }
                    i += 1;
                )*
                ::std::option::Option::None
            }

            #[allow(unused_mut, unused_assignments)]
            fn field_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn $crate::Reflect> {
                let mut i = 0usize;
                $(
                    if index == i {
                        return ::std::option::Option::Some(&mut self.$field);
                    }
                    i += 1;
                )*
                ::std::option::Option::None
            }
        }
    };
}
