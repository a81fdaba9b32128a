//! Store to record.

use std::num::IntErrorKind;

use envio_store::VarReader;

use crate::cache::{DescriptorCache, FieldDescriptorList};
use crate::dispatch::DispatchTable;
use crate::error::{Direction, Error, Fault, Flow};
use crate::record::Record;
use crate::reflect::{Reflect, ValueMut};
use crate::state::Context;

/// One get traversal.
pub(crate) struct Getter<'a> {
    store: &'a dyn VarReader,
    cache: &'a DescriptorCache,
    table: &'static DispatchTable,
    ctx: &'a mut Context,
}

impl<'a> Getter<'a> {
    pub(crate) fn new(
        store: &'a dyn VarReader,
        cache: &'a DescriptorCache,
        table: &'static DispatchTable,
        ctx: &'a mut Context,
    ) -> Self {
        Getter {
            store,
            cache,
            table,
            ctx,
        }
    }

    pub(crate) fn run(&mut self, root: &mut dyn Reflect) -> Result<(), Error> {
        self.reflect_value(root)
            .map_err(|fault| fault.into_error(Direction::Get, self.ctx.label))
    }

    fn reflect_value(&mut self, v: &mut dyn Reflect) -> Flow {
        (self.table.getter(v.kind()))(self, v)
    }

    fn fields(&mut self, list: &FieldDescriptorList, record: &mut dyn Record) -> Flow {
        let outer = std::mem::replace(&mut self.ctx.label, list.type_name());
        self.ctx.active.push(list.type_id());

        for field in list {
            self.ctx.enter(field);
            let value = record
                .field_mut(field.index())
                .ok_or(Error::FieldIndex {
                    record: list.type_name(),
                    index: field.index(),
                })?;

            match field.embedded() {
                Some(embedded) => self.fields(embedded, embedded_record(value)?)?,
                None => (field.handlers().get)(self, value)?,
            }
        }

        self.ctx.active.pop();
        self.ctx.label = outer;
        Ok(())
    }

    /// Load the cursor's value into the buffer.
    ///
    /// Returns false when there is nothing to convert: the key is absent or
    /// empty and the field is optional, so the current value stays.
    fn read_var(&mut self) -> Result<bool, Fault> {
        let key = self.ctx.field.key;
        self.ctx.buf.clear();
        self.store
            .read_into(key, &mut self.ctx.buf)
            .map_err(|source| Error::Read { key, source })?;

        if self.ctx.buf.is_empty() {
            if self.ctx.field.mandatory {
                return Err(Error::MissingRequired { key }.into());
            }
            return Ok(false);
        }
        Ok(true)
    }
}

fn embedded_record(value: &mut dyn Reflect) -> Result<&mut dyn Record, Fault> {
    let type_name = value.shape().type_name();
    match value.value_mut() {
        ValueMut::Record(record) => Ok(record),
        ValueMut::Optional(opt) => {
            let elem = opt.elem_shape().type_name();
            match opt.get_mut() {
                Some(inner) => embedded_record(inner),
                None => Err(Error::AbsentEmbedded { type_name: elem }.into()),
            }
        }
        _ => Err(Error::UnsupportedType { type_name }.into()),
    }
}

fn mismatch(type_name: &'static str) -> Fault {
    Error::UnsupportedType { type_name }.into()
}

pub(crate) fn boolean(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let target = v.shape().type_name();
    if !s.read_var()? {
        return Ok(());
    }
    let ValueMut::Bool(slot) = v.value_mut() else {
        return Err(mismatch(target));
    };
    *slot = parse_bool(&s.ctx.buf).ok_or_else(|| s.ctx.parse_error(target, "invalid syntax"))?;
    Ok(())
}

pub(crate) fn int(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let target = v.shape().type_name();
    if !s.read_var()? {
        return Ok(());
    }
    let ValueMut::Int(slot) = v.value_mut() else {
        return Err(mismatch(target));
    };
    match s.ctx.buf.parse::<i64>() {
        Ok(n) if slot.set(n) => Ok(()),
        Ok(_) => Err(s.ctx.out_of_range(target)),
        Err(e) if is_overflow(e.kind()) => Err(s.ctx.out_of_range(target)),
        Err(e) => Err(s.ctx.parse_error(target, e)),
    }
}

pub(crate) fn uint(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let target = v.shape().type_name();
    if !s.read_var()? {
        return Ok(());
    }
    let ValueMut::Uint(slot) = v.value_mut() else {
        return Err(mismatch(target));
    };
    match s.ctx.buf.parse::<u64>() {
        Ok(n) if slot.set(n) => Ok(()),
        Ok(_) => Err(s.ctx.out_of_range(target)),
        Err(e) if is_overflow(e.kind()) => Err(s.ctx.out_of_range(target)),
        Err(e) => Err(s.ctx.parse_error(target, e)),
    }
}

pub(crate) fn float(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let target = v.shape().type_name();
    if !s.read_var()? {
        return Ok(());
    }
    let ValueMut::Float(slot) = v.value_mut() else {
        return Err(mismatch(target));
    };
    let raw = s.ctx.buf.as_str();
    let parsed = if slot.bits() == 32 {
        raw.parse::<f32>().map(f64::from)
    } else {
        raw.parse::<f64>()
    };
    match parsed {
        Ok(x) if x.is_infinite() && !names_infinity(raw) => Err(s.ctx.out_of_range(target)),
        Ok(x) => {
            slot.set(x);
            Ok(())
        }
        Err(e) => Err(s.ctx.parse_error(target, e)),
    }
}

pub(crate) fn bytes(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let target = v.shape().type_name();
    if !s.read_var()? {
        return Ok(());
    }
    let ValueMut::Bytes(slot) = v.value_mut() else {
        return Err(mismatch(target));
    };
    slot.clear();
    slot.extend_from_slice(s.ctx.buf.as_bytes());
    Ok(())
}

pub(crate) fn string(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let target = v.shape().type_name();
    if !s.read_var()? {
        return Ok(());
    }
    let ValueMut::String(slot) = v.value_mut() else {
        return Err(mismatch(target));
    };
    slot.clear();
    slot.push_str(&s.ctx.buf);
    Ok(())
}

pub(crate) fn record(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let shape = v.shape();
    let ValueMut::Record(record) = v.value_mut() else {
        return Err(mismatch(shape.type_name()));
    };
    let list = s.cache.descriptors_for(&shape);
    s.fields(&list, record)
}

/// An absent value is only materialized if converting into it produced
/// something other than the zero value.
pub(crate) fn optional(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let target = v.shape().type_name();
    let ValueMut::Optional(opt) = v.value_mut() else {
        return Err(mismatch(target));
    };
    if let Some(inner) = opt.get_mut() {
        return s.reflect_value(inner);
    }
    if s.ctx.is_active(&opt.elem_shape()) {
        return Ok(());
    }

    let result = s.reflect_value(opt.insert_zero());
    let keep = result.is_ok() && opt.get().is_some_and(|inner| !inner.is_zero());
    if !keep {
        opt.clear();
    }
    result
}

pub(crate) fn dynamic(s: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    let target = v.shape().type_name();
    match v.value_mut() {
        ValueMut::Dynamic(Some(held)) => s.reflect_value(held),
        ValueMut::Dynamic(None) => Err(s.ctx.nil_dynamic()),
        _ => Err(mismatch(target)),
    }
}

pub(crate) fn unsupported(_: &mut Getter<'_>, v: &mut dyn Reflect) -> Flow {
    Err(mismatch(v.shape().type_name()))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn is_overflow(kind: &IntErrorKind) -> bool {
    matches!(kind, IntErrorKind::PosOverflow | IntErrorKind::NegOverflow)
}

fn names_infinity(raw: &str) -> bool {
    let unsigned = raw.trim_start_matches(|c| c == '+' || c == '-');
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}
