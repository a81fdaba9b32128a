//! Type categories and the value views the traversal works through.
//!
//! Rust has no runtime reflection, so every type that can appear in a record
//! implements [`Reflect`]: it reports its [`Shape`] (identity, name, category)
//! and hands out a category-specific view of itself ([`ValueRef`] /
//! [`ValueMut`]). The engine never looks at a concrete type; it dispatches on
//! [`Kind`] and talks to the view.
//!
//! Implementations are provided for the scalar types, `String`, `Vec<u8>`,
//! `Option<T>`, `Box<T>` and [`DynValue`]. A handful of container types
//! (`Vec<T>` for other element types, maps, sets), `char` and `()` implement the
//! trait with [`Kind::Unsupported`], so using them as fields is a runtime
//! error rather than a silent skip. Records get their implementation from the
//! [`record!`](crate::record) macro.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::record::{FieldMeta, Record};

/// The category a type belongs to. Selects the conversion handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    Bytes,
    String,
    /// A struct declared with `record!`.
    Record,
    /// `Option<T>`: may be absent.
    Optional,
    /// [`DynValue`]: the concrete type is only known at runtime.
    Dynamic,
    Unsupported,
}

impl Kind {
    pub const COUNT: usize = 10;

    pub const ALL: [Kind; Kind::COUNT] = [
        Kind::Bool,
        Kind::Int,
        Kind::Uint,
        Kind::Float,
        Kind::Bytes,
        Kind::String,
        Kind::Record,
        Kind::Optional,
        Kind::Dynamic,
        Kind::Unsupported,
    ];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::Bytes => "bytes",
            Kind::String => "string",
            Kind::Record => "record",
            Kind::Optional => "optional",
            Kind::Dynamic => "dynamic",
            Kind::Unsupported => "unsupported",
        }
    }

    /// Whether values of this kind are read from / written to a single key.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Kind::Bool | Kind::Int | Kind::Uint | Kind::Float | Kind::Bytes | Kind::String
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of a type.
///
/// Computed per type, never per value: two values of the same type always
/// have equal shapes.
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    type_id: TypeId,
    type_name: &'static str,
    kind: Kind,
    fields: Option<fn() -> Vec<FieldMeta>>,
    elem: Option<fn() -> Shape>,
}

impl Shape {
    /// Shape of a type with no inner structure.
    pub fn new<T: Any>(type_name: &'static str, kind: Kind) -> Self {
        Shape {
            type_id: TypeId::of::<T>(),
            type_name,
            kind,
            fields: None,
            elem: None,
        }
    }

    /// Shape of a record; the field metadata is resolved on demand.
    pub fn record<T: Record + Typed>(type_name: &'static str) -> Self {
        Shape {
            fields: Some(T::fields),
            ..Shape::new::<T>(type_name, Kind::Record)
        }
    }

    /// Shape of an optional wrapper `O` around `E`.
    pub fn optional<O: Any, E: Typed>(type_name: &'static str) -> Self {
        Shape {
            elem: Some(E::type_shape),
            ..Shape::new::<O>(type_name, Kind::Optional)
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Field metadata, for records.
    pub fn record_fields(&self) -> Option<Vec<FieldMeta>> {
        self.fields.map(|fields| fields())
    }

    /// Element shape, for optionals.
    pub fn elem(&self) -> Option<Shape> {
        self.elem.map(|elem| elem())
    }

    /// The record reached from this shape: itself, or the element of an
    /// optional record.
    pub fn composite(&self) -> Option<Shape> {
        match self.kind {
            Kind::Record => Some(*self),
            Kind::Optional => self.elem().filter(|elem| elem.kind == Kind::Record),
            _ => None,
        }
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.kind == other.kind
    }
}

impl Eq for Shape {}

/// A value the engine can traverse.
///
/// Object-safe: the engine only ever holds `&dyn Reflect` /
/// `&mut dyn Reflect`.
pub trait Reflect: Any + Send + Sync {
    fn shape(&self) -> Shape;

    fn kind(&self) -> Kind {
        self.shape().kind()
    }

    /// Whether this is the zero value of its type.
    ///
    /// Numbers are zero at `0` (`-0.0` included), strings and byte
    /// sequences when empty, optionals when absent, records when every field
    /// is zero.
    fn is_zero(&self) -> bool;

    fn value(&self) -> ValueRef<'_>;

    fn value_mut(&mut self) -> ValueMut<'_>;
}

/// The static side of [`Reflect`]: shape without a value, and a zero value.
pub trait Typed: Reflect + Default {
    fn type_shape() -> Shape;
}

/// Read access to a value, by category.
pub enum ValueRef<'a> {
    Bool(bool),
    Int(&'a dyn SignedInt),
    Uint(&'a dyn UnsignedInt),
    Float(&'a dyn FloatNum),
    Bytes(&'a [u8]),
    String(&'a str),
    Record(&'a dyn Record),
    Optional(&'a dyn OptionalValue),
    Dynamic(Option<&'a dyn Reflect>),
    Unsupported,
}

/// Write access to a value, by category.
pub enum ValueMut<'a> {
    Bool(&'a mut bool),
    Int(&'a mut dyn SignedInt),
    Uint(&'a mut dyn UnsignedInt),
    Float(&'a mut dyn FloatNum),
    Bytes(&'a mut Vec<u8>),
    String(&'a mut String),
    Record(&'a mut dyn Record),
    Optional(&'a mut dyn OptionalValue),
    Dynamic(Option<&'a mut dyn Reflect>),
    Unsupported,
}

/// A signed integer of some width.
pub trait SignedInt: Send + Sync {
    fn bits(&self) -> u32;
    fn get(&self) -> i64;
    /// Store `v` if it fits the width. Returns whether it did.
    fn set(&mut self, v: i64) -> bool;
}

/// An unsigned integer of some width.
pub trait UnsignedInt: Send + Sync {
    fn bits(&self) -> u32;
    fn get(&self) -> u64;
    /// Store `v` if it fits the width. Returns whether it did.
    fn set(&mut self, v: u64) -> bool;
}

/// A floating point number, 32 or 64 bits.
pub trait FloatNum: Send + Sync {
    fn bits(&self) -> u32;
    fn get(&self) -> f64;
    /// Store `v`, rounding to the width.
    fn set(&mut self, v: f64);
}

/// An optional value (`Option<T>`).
pub trait OptionalValue: Send + Sync {
    fn elem_shape(&self) -> Shape;
    fn get(&self) -> Option<&dyn Reflect>;
    fn get_mut(&mut self) -> Option<&mut dyn Reflect>;
    /// Replace the content with the zero value of the element type.
    fn insert_zero(&mut self) -> &mut dyn Reflect;
    fn clear(&mut self);
    /// A detached zero value of the element type.
    fn zero_elem(&self) -> Box<dyn Reflect>;
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl SignedInt for $t {
            fn bits(&self) -> u32 {
                <$t>::BITS
            }

            fn get(&self) -> i64 {
                *self as i64
            }

            fn set(&mut self, v: i64) -> bool {
                match <$t>::try_from(v) {
                    Ok(v) => {
                        *self = v;
                        true
                    }
                    Err(_) => false,
                }
            }
        }

        impl Reflect for $t {
            fn shape(&self) -> Shape {
                <$t as Typed>::type_shape()
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }

            fn value(&self) -> ValueRef<'_> {
                ValueRef::Int(self)
            }

            fn value_mut(&mut self) -> ValueMut<'_> {
                ValueMut::Int(self)
            }
        }

        impl Typed for $t {
            fn type_shape() -> Shape {
                Shape::new::<$t>(stringify!($t), Kind::Int)
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl UnsignedInt for $t {
            fn bits(&self) -> u32 {
                <$t>::BITS
            }

            fn get(&self) -> u64 {
                *self as u64
            }

            fn set(&mut self, v: u64) -> bool {
                match <$t>::try_from(v) {
                    Ok(v) => {
                        *self = v;
                        true
                    }
                    Err(_) => false,
                }
            }
        }

        impl Reflect for $t {
            fn shape(&self) -> Shape {
                <$t as Typed>::type_shape()
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }

            fn value(&self) -> ValueRef<'_> {
                ValueRef::Uint(self)
            }

            fn value_mut(&mut self) -> ValueMut<'_> {
                ValueMut::Uint(self)
            }
        }

        impl Typed for $t {
            fn type_shape() -> Shape {
                Shape::new::<$t>(stringify!($t), Kind::Uint)
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);

impl FloatNum for f32 {
    fn bits(&self) -> u32 {
        32
    }

    fn get(&self) -> f64 {
        f64::from(*self)
    }

    fn set(&mut self, v: f64) {
        *self = v as f32;
    }
}

impl FloatNum for f64 {
    fn bits(&self) -> u32 {
        64
    }

    fn get(&self) -> f64 {
        *self
    }

    fn set(&mut self, v: f64) {
        *self = v;
    }
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl Reflect for $t {
            fn shape(&self) -> Shape {
                <$t as Typed>::type_shape()
            }

            fn is_zero(&self) -> bool {
                *self == 0.0
            }

            fn value(&self) -> ValueRef<'_> {
                ValueRef::Float(self)
            }

            fn value_mut(&mut self) -> ValueMut<'_> {
                ValueMut::Float(self)
            }
        }

        impl Typed for $t {
            fn type_shape() -> Shape {
                Shape::new::<$t>(stringify!($t), Kind::Float)
            }
        }
    )*};
}

impl_float!(f32, f64);

impl Reflect for bool {
    fn shape(&self) -> Shape {
        <bool as Typed>::type_shape()
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn value(&self) -> ValueRef<'_> {
        ValueRef::Bool(*self)
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Bool(self)
    }
}

impl Typed for bool {
    fn type_shape() -> Shape {
        Shape::new::<bool>("bool", Kind::Bool)
    }
}

impl Reflect for String {
    fn shape(&self) -> Shape {
        <String as Typed>::type_shape()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn value(&self) -> ValueRef<'_> {
        ValueRef::String(self)
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::String(self)
    }
}

impl Typed for String {
    fn type_shape() -> Shape {
        Shape::new::<String>("String", Kind::String)
    }
}

// `Vec<u8>` is a byte sequence, every other element type is unsupported.
impl<T: Send + Sync + 'static> Reflect for Vec<T> {
    fn shape(&self) -> Shape {
        <Vec<T> as Typed>::type_shape()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn value(&self) -> ValueRef<'_> {
        match (self as &dyn Any).downcast_ref::<Vec<u8>>() {
            Some(bytes) => ValueRef::Bytes(bytes),
            None => ValueRef::Unsupported,
        }
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        match (self as &mut dyn Any).downcast_mut::<Vec<u8>>() {
            Some(bytes) => ValueMut::Bytes(bytes),
            None => ValueMut::Unsupported,
        }
    }
}

impl<T: Send + Sync + 'static> Typed for Vec<T> {
    fn type_shape() -> Shape {
        let kind = if TypeId::of::<T>() == TypeId::of::<u8>() {
            Kind::Bytes
        } else {
            Kind::Unsupported
        };
        Shape::new::<Vec<T>>(std::any::type_name::<Vec<T>>(), kind)
    }
}

impl<T: Typed> OptionalValue for Option<T> {
    fn elem_shape(&self) -> Shape {
        T::type_shape()
    }

    fn get(&self) -> Option<&dyn Reflect> {
        self.as_ref().map(|v| v as &dyn Reflect)
    }

    fn get_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.as_mut().map(|v| v as &mut dyn Reflect)
    }

    fn insert_zero(&mut self) -> &mut dyn Reflect {
        self.insert(T::default())
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn zero_elem(&self) -> Box<dyn Reflect> {
        Box::new(T::default())
    }
}

impl<T: Typed> Reflect for Option<T> {
    fn shape(&self) -> Shape {
        <Option<T> as Typed>::type_shape()
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn value(&self) -> ValueRef<'_> {
        ValueRef::Optional(self)
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Optional(self)
    }
}

impl<T: Typed> Typed for Option<T> {
    fn type_shape() -> Shape {
        Shape::optional::<Option<T>, T>(std::any::type_name::<Option<T>>())
    }
}

// A box is invisible: same shape, same view as its content.
impl<T: Typed> Reflect for Box<T> {
    fn shape(&self) -> Shape {
        T::type_shape()
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn value(&self) -> ValueRef<'_> {
        (**self).value()
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        (**self).value_mut()
    }
}

impl<T: Typed> Typed for Box<T> {
    fn type_shape() -> Shape {
        T::type_shape()
    }
}

/// A field whose concrete type is chosen at runtime.
///
/// The engine traverses whatever value is held, dispatching on that value's
/// own kind. Holding nothing is an error in both directions.
#[derive(Default)]
pub struct DynValue(Option<Box<dyn Reflect>>);

impl DynValue {
    pub fn new<T: Reflect>(value: T) -> Self {
        DynValue(Some(Box::new(value)))
    }

    pub fn none() -> Self {
        DynValue(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&dyn Reflect> {
        self.0.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.0.as_deref_mut()
    }

    pub fn replace<T: Reflect>(&mut self, value: T) -> Option<Box<dyn Reflect>> {
        self.0.replace(Box::new(value))
    }

    pub fn take(&mut self) -> Option<Box<dyn Reflect>> {
        self.0.take()
    }

    /// The held value, if it is a `T`.
    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        let held: &dyn Any = self.0.as_deref()?;
        held.downcast_ref::<T>()
    }
}

impl fmt::Debug for DynValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(held) => write!(f, "DynValue({})", held.shape().type_name()),
            None => f.write_str("DynValue(None)"),
        }
    }
}

impl Reflect for DynValue {
    fn shape(&self) -> Shape {
        <DynValue as Typed>::type_shape()
    }

    fn is_zero(&self) -> bool {
        self.0.is_none()
    }

    fn value(&self) -> ValueRef<'_> {
        ValueRef::Dynamic(self.get())
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Dynamic(self.get_mut())
    }
}

impl Typed for DynValue {
    fn type_shape() -> Shape {
        Shape::new::<DynValue>("DynValue", Kind::Dynamic)
    }
}

macro_rules! impl_unsupported {
    ($($t:ident<$($p:ident),*>),*) => {$(
        impl<$($p: Send + Sync + 'static),*> Reflect for $t<$($p),*> {
            fn shape(&self) -> Shape {
                <$t<$($p),*> as Typed>::type_shape()
            }

            fn is_zero(&self) -> bool {
                self.is_empty()
            }

            fn value(&self) -> ValueRef<'_> {
                ValueRef::Unsupported
            }

            fn value_mut(&mut self) -> ValueMut<'_> {
                ValueMut::Unsupported
            }
        }

        impl<$($p: Send + Sync + 'static),*> Typed for $t<$($p),*> {
            fn type_shape() -> Shape {
                Shape::new::<$t<$($p),*>>(std::any::type_name::<$t<$($p),*>>(), Kind::Unsupported)
            }
        }
    )*};
}

impl_unsupported!(HashMap<K, V>, BTreeMap<K, V>, HashSet<T>, BTreeSet<T>);

impl Reflect for char {
    fn shape(&self) -> Shape {
        <char as Typed>::type_shape()
    }

    fn is_zero(&self) -> bool {
        *self == '\0'
    }

    fn value(&self) -> ValueRef<'_> {
        ValueRef::Unsupported
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Unsupported
    }
}

impl Typed for char {
    fn type_shape() -> Shape {
        Shape::new::<char>("char", Kind::Unsupported)
    }
}

impl Reflect for () {
    fn shape(&self) -> Shape {
        <() as Typed>::type_shape()
    }

    fn is_zero(&self) -> bool {
        true
    }

    fn value(&self) -> ValueRef<'_> {
        ValueRef::Unsupported
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Unsupported
    }
}

impl Typed for () {
    fn type_shape() -> Shape {
        Shape::new::<()>("()", Kind::Unsupported)
    }
}
