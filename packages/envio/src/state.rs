//! Per-call traversal state and its pool.
//!
//! Each top-level get or set takes one [`Context`] out of the pool, threads
//! it through the whole recursive traversal, and gives it back when the
//! guard drops, whichever way the call ends.

use std::any::TypeId;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::FieldDescriptor;
use crate::error::{ConvertError, Error, Fault};
use crate::reflect::Shape;

// Buffers that grew past this are not kept in the pool.
const MAX_RETAINED_BUFFER: usize = 4096;

/// The field being converted.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Cursor {
    pub name: &'static str,
    pub key: &'static str,
    pub mandatory: bool,
}

/// Mutable state of one traversal.
#[derive(Debug, Default)]
pub(crate) struct Context {
    pub field: Cursor,
    /// Raw store value on get, formatted value on set.
    pub buf: String,
    /// Type name of the record in progress.
    pub label: &'static str,
    /// Records being traversed, outermost first.
    pub active: Vec<TypeId>,
}

impl Context {
    fn reset(&mut self) {
        self.field = Cursor::default();
        self.buf.clear();
        self.label = "";
        self.active.clear();
    }

    /// Whether `shape` leads to a record that is already being traversed.
    ///
    /// An absent optional of such a record is not materialized: its zero
    /// value holds another absent optional of the same record, without end.
    pub(crate) fn is_active(&self, shape: &Shape) -> bool {
        shape
            .composite()
            .is_some_and(|record| self.active.contains(&record.type_id()))
    }

    pub(crate) fn enter(&mut self, field: &FieldDescriptor) {
        self.field = field.cursor();
        self.buf.clear();
    }

    pub(crate) fn parse_error(&self, target: &'static str, reason: impl ToString) -> Fault {
        Fault::Unexpected(ConvertError::Parse {
            key: self.field.key,
            value: self.buf.clone(),
            target,
            reason: reason.to_string(),
        })
    }

    pub(crate) fn out_of_range(&self, target: &'static str) -> Fault {
        Fault::Unexpected(ConvertError::OutOfRange {
            key: self.field.key,
            value: self.buf.clone(),
            target,
        })
    }

    pub(crate) fn nil_dynamic(&self) -> Fault {
        Fault::Reported(Error::NilDynamic {
            record: self.label,
            field: self.field.name,
        })
    }
}

/// Free list of idle contexts.
#[derive(Debug)]
pub(crate) struct StatePool {
    free: Mutex<Vec<Context>>,
    capacity: usize,
}

impl StatePool {
    pub(crate) fn new(capacity: usize) -> Self {
        StatePool {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Take an idle context, or allocate one, reset and ready for a call.
    pub(crate) fn acquire(&self) -> PooledContext<'_> {
        let mut ctx = match self.free().pop() {
            Some(ctx) => ctx,
            None => {
                tracing::debug!("allocating traversal context");
                Context::default()
            }
        };
        ctx.reset();
        PooledContext { pool: self, ctx }
    }

    fn release(&self, mut ctx: Context) {
        if ctx.buf.capacity() > MAX_RETAINED_BUFFER {
            ctx.buf = String::new();
        }
        let mut free = self.free();
        if free.len() < self.capacity {
            free.push(ctx);
        }
    }

    /// Number of idle contexts.
    pub(crate) fn idle(&self) -> usize {
        self.free().len()
    }

    // A context is pushed or popped whole, so a poisoned list is still valid.
    fn free(&self) -> MutexGuard<'_, Vec<Context>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A context on loan from a [`StatePool`]. Returns it on drop.
pub(crate) struct PooledContext<'p> {
    pool: &'p StatePool,
    ctx: Context,
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.ctx
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.ctx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_allocates_then_reuses() {
        let pool = StatePool::new(4);
        assert_eq!(pool.idle(), 0);

        {
            let mut ctx = pool.acquire();
            ctx.buf.push_str("secret");
            ctx.label = "Config";
            ctx.field.key = "TOKEN";
            ctx.active.push(TypeId::of::<u8>());
        }
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire();
        assert_eq!(pool.idle(), 0);
        assert!(ctx.buf.is_empty());
        assert!(ctx.buf.capacity() >= "secret".len());
        assert_eq!(ctx.label, "");
        assert_eq!(ctx.field.key, "");
        assert!(ctx.active.is_empty());
    }

    #[test]
    fn pool_never_exceeds_capacity() {
        let pool = StatePool::new(2);
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        drop(a);
        drop(b);
        drop(c);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let pool = StatePool::new(0);
        drop(pool.acquire());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn oversized_buffers_are_not_retained() {
        let pool = StatePool::new(1);
        {
            let mut ctx = pool.acquire();
            ctx.buf.push_str(&"x".repeat(MAX_RETAINED_BUFFER * 2));
        }
        let ctx = pool.acquire();
        assert!(ctx.buf.capacity() <= MAX_RETAINED_BUFFER);
    }

    #[test]
    fn released_on_panic() {
        let pool = StatePool::new(1);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = pool.acquire();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn errors_carry_cursor() {
        let mut ctx = Context::default();
        ctx.field = Cursor {
            name: "port",
            key: "PORT",
            mandatory: false,
        };
        ctx.buf.push_str("99999");
        ctx.label = "Config";

        match ctx.out_of_range("u16") {
            Fault::Unexpected(ConvertError::OutOfRange { key, value, target }) => {
                assert_eq!(key, "PORT");
                assert_eq!(value, "99999");
                assert_eq!(target, "u16");
            }
            other => panic!("unexpected {:?}", other),
        }

        match ctx.nil_dynamic() {
            Fault::Reported(Error::NilDynamic { record, field }) => {
                assert_eq!(record, "Config");
                assert_eq!(field, "port");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
