//! Record to store.

use std::fmt::Write as _;

use envio_store::VarWriter;

use crate::cache::{DescriptorCache, FieldDescriptorList};
use crate::dispatch::DispatchTable;
use crate::error::{ConvertError, Direction, Error, Fault, Flow};
use crate::record::Record;
use crate::reflect::{Reflect, ValueRef};
use crate::state::Context;

/// One set traversal.
pub(crate) struct Setter<'a> {
    store: &'a dyn VarWriter,
    cache: &'a DescriptorCache,
    table: &'static DispatchTable,
    ctx: &'a mut Context,
}

impl<'a> Setter<'a> {
    pub(crate) fn new(
        store: &'a dyn VarWriter,
        cache: &'a DescriptorCache,
        table: &'static DispatchTable,
        ctx: &'a mut Context,
    ) -> Self {
        Setter {
            store,
            cache,
            table,
            ctx,
        }
    }

    pub(crate) fn run(&mut self, root: &dyn Reflect) -> Result<(), Error> {
        self.reflect_value(root)
            .map_err(|fault| fault.into_error(Direction::Set, self.ctx.label))
    }

    fn reflect_value(&mut self, v: &dyn Reflect) -> Flow {
        (self.table.setter(v.kind()))(self, v)
    }

    fn fields(&mut self, list: &FieldDescriptorList, record: &dyn Record) -> Flow {
        let outer = std::mem::replace(&mut self.ctx.label, list.type_name());
        self.ctx.active.push(list.type_id());

        for field in list {
            self.ctx.enter(field);
            let value = record.field(field.index()).ok_or(Error::FieldIndex {
                record: list.type_name(),
                index: field.index(),
            })?;

            // A mandatory field left at zero is not written, so a value
            // already in the store is not clobbered.
            if field.is_mandatory() && value.is_zero() {
                continue;
            }

            match field.embedded() {
                Some(embedded) => self.embedded(embedded, value)?,
                None => (field.handlers().set)(self, value)?,
            }
        }

        self.ctx.active.pop();
        self.ctx.label = outer;
        Ok(())
    }

    // An absent embedded record is written as its zero value.
    fn embedded(&mut self, list: &FieldDescriptorList, value: &dyn Reflect) -> Flow {
        let type_name = value.shape().type_name();
        match value.value() {
            ValueRef::Record(record) => self.fields(list, record),
            ValueRef::Optional(opt) => match opt.get() {
                Some(inner) => self.embedded(list, inner),
                None => self.embedded(list, opt.zero_elem().as_ref()),
            },
            _ => Err(mismatch(type_name)),
        }
    }

    fn write(&self, value: &str) -> Flow {
        let key = self.ctx.field.key;
        self.store
            .write(key, value)
            .map_err(|source| ConvertError::Write { key, source })?;
        Ok(())
    }

    fn format(&mut self, value: impl std::fmt::Display) -> Flow {
        self.ctx.buf.clear();
        // Writing into a String cannot fail.
        let _ = write!(self.ctx.buf, "{}", value);
        self.write(&self.ctx.buf)
    }

    fn format_exp(&mut self, value: impl std::fmt::LowerExp) -> Flow {
        self.ctx.buf.clear();
        let _ = write!(self.ctx.buf, "{:e}", value);
        self.write(&self.ctx.buf)
    }
}

fn mismatch(type_name: &'static str) -> Fault {
    Error::UnsupportedType { type_name }.into()
}

pub(crate) fn boolean(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    match v.value() {
        ValueRef::Bool(b) => s.format(b),
        _ => Err(mismatch(v.shape().type_name())),
    }
}

pub(crate) fn int(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    match v.value() {
        ValueRef::Int(n) => s.format(n.get()),
        _ => Err(mismatch(v.shape().type_name())),
    }
}

pub(crate) fn uint(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    match v.value() {
        ValueRef::Uint(n) => s.format(n.get()),
        _ => Err(mismatch(v.shape().type_name())),
    }
}

/// Shortest text that parses back to the same value at the field's width.
/// Very large and very small magnitudes use exponent notation.
pub(crate) fn float(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    let ValueRef::Float(x) = v.value() else {
        return Err(mismatch(v.shape().type_name()));
    };
    let n = x.get();
    let exponent = n.is_finite() && n != 0.0 && !PLAIN_FLOAT_RANGE.contains(&n.abs());
    match (x.bits() == 32, exponent) {
        (true, false) => s.format(n as f32),
        (true, true) => s.format_exp(n as f32),
        (false, false) => s.format(n),
        (false, true) => s.format_exp(n),
    }
}

// Magnitudes written in positional notation.
const PLAIN_FLOAT_RANGE: std::ops::Range<f64> = 1e-4..1e21;

pub(crate) fn bytes(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    match v.value() {
        ValueRef::Bytes(raw) => {
            let key = s.ctx.field.key;
            let text = std::str::from_utf8(raw).map_err(|_| ConvertError::InvalidUtf8 { key })?;
            s.write(text)
        }
        _ => Err(mismatch(v.shape().type_name())),
    }
}

pub(crate) fn string(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    match v.value() {
        ValueRef::String(text) => s.write(text),
        _ => Err(mismatch(v.shape().type_name())),
    }
}

pub(crate) fn record(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    let shape = v.shape();
    let ValueRef::Record(record) = v.value() else {
        return Err(mismatch(shape.type_name()));
    };
    let list = s.cache.descriptors_for(&shape);
    s.fields(&list, record)
}

/// An absent value is written as the zero value of its element type,
/// unless that is a record already being written.
pub(crate) fn optional(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    let ValueRef::Optional(opt) = v.value() else {
        return Err(mismatch(v.shape().type_name()));
    };
    match opt.get() {
        Some(inner) => s.reflect_value(inner),
        None if s.ctx.is_active(&opt.elem_shape()) => Ok(()),
        None => s.reflect_value(opt.zero_elem().as_ref()),
    }
}

pub(crate) fn dynamic(s: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    match v.value() {
        ValueRef::Dynamic(Some(held)) => s.reflect_value(held),
        ValueRef::Dynamic(None) => Err(s.ctx.nil_dynamic()),
        _ => Err(mismatch(v.shape().type_name())),
    }
}

pub(crate) fn unsupported(_: &mut Setter<'_>, v: &dyn Reflect) -> Flow {
    Err(mismatch(v.shape().type_name()))
}
