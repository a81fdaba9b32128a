//! Field descriptor cache.
//!
//! For every record type the engine sees, the field metadata is resolved
//! once into a [`FieldDescriptorList`]: keys, flags, locators, handlers and
//! the nested lists of embedded records. Lists are published behind a
//! per-type once-gate and never change afterwards.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::dispatch::{DispatchTable, Handlers};
use crate::record::FieldMeta;
use crate::reflect::Shape;
use crate::state::Cursor;

/// One bound field of a record.
pub struct FieldDescriptor {
    name: &'static str,
    key: &'static str,
    mandatory: bool,
    index: usize,
    shape: Shape,
    embedded: Option<Arc<FieldDescriptorList>>,
    handlers: Handlers,
}

impl FieldDescriptor {
    fn new(index: usize, meta: &FieldMeta, handlers: Handlers) -> Self {
        FieldDescriptor {
            name: meta.name(),
            key: meta.key(),
            mandatory: meta.is_mandatory(),
            index,
            shape: meta.shape(),
            embedded: None,
            handlers,
        }
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

    /// Position of the field in its record.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Descriptors of the embedded record, if this field embeds one.
    pub fn embedded(&self) -> Option<&FieldDescriptorList> {
        self.embedded.as_deref()
    }

    pub(crate) fn handlers(&self) -> Handlers {
        self.handlers
    }

    pub(crate) fn cursor(&self) -> Cursor {
        Cursor {
            name: self.name,
            key: self.key,
            mandatory: self.mandatory,
        }
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("mandatory", &self.mandatory)
            .field("index", &self.index)
            .field("kind", &self.shape.kind())
            .field("embedded", &self.embedded)
            .finish()
    }
}

/// The bound fields of one record type, in traversal order.
#[derive(Debug)]
pub struct FieldDescriptorList {
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl FieldDescriptorList {
    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every key bound by this list, embedded lists included, in traversal
    /// order.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys(&self, keys: &mut Vec<&'static str>) {
        for field in &self.fields {
            match &field.embedded {
                Some(list) => list.collect_keys(keys),
                None => keys.push(field.key),
            }
        }
    }
}

impl<'a> IntoIterator for &'a FieldDescriptorList {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

type Gate = Arc<OnceLock<Arc<FieldDescriptorList>>>;

/// Append-only registry of descriptor lists, keyed by record type.
pub(crate) struct DescriptorCache {
    lists: RwLock<HashMap<TypeId, Gate>>,
    table: &'static DispatchTable,
}

impl DescriptorCache {
    pub(crate) fn new(table: &'static DispatchTable) -> Self {
        DescriptorCache {
            lists: RwLock::new(HashMap::new()),
            table,
        }
    }

    /// The descriptor list for a record shape, built on first use.
    pub(crate) fn descriptors_for(&self, shape: &Shape) -> Arc<FieldDescriptorList> {
        let gate = self.gate(shape.type_id());
        Arc::clone(gate.get_or_init(|| {
            let list = Builder::new(self.table).build(shape);
            tracing::debug!(
                record = list.type_name,
                fields = list.fields.len(),
                "built field descriptors"
            );
            Arc::new(list)
        }))
    }

    /// Number of record types built so far.
    pub(crate) fn len(&self) -> usize {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|gate| gate.get().is_some())
            .count()
    }

    // The map lock only guards finding or inserting the gate; the build runs
    // outside of it. Entries are never removed, so poisoning is harmless.
    fn gate(&self, id: TypeId) -> Gate {
        if let Some(gate) = self
            .lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Arc::clone(gate);
        }
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(lists.entry(id).or_default())
    }
}

/// Resolves field metadata into descriptors for one top-level record.
///
/// Keys are claimed in traversal order across embedded records; a later
/// field with an already-claimed key is left out.
struct Builder {
    table: &'static DispatchTable,
    claimed: HashSet<&'static str>,
    building: Vec<TypeId>,
}

impl Builder {
    fn new(table: &'static DispatchTable) -> Self {
        Builder {
            table,
            claimed: HashSet::new(),
            building: Vec::new(),
        }
    }

    fn build(&mut self, shape: &Shape) -> FieldDescriptorList {
        self.building.push(shape.type_id());
        let metas = shape.record_fields().unwrap_or_default();
        let mut fields = Vec::with_capacity(metas.len());

        for (index, meta) in metas.iter().enumerate() {
            let handlers = self.table.handlers_for(meta.shape().kind());

            if meta.is_embedded() {
                match meta.shape().composite() {
                    Some(target) if self.building.contains(&target.type_id()) => {
                        tracing::warn!(
                            record = shape.type_name(),
                            field = meta.name(),
                            embedded = target.type_name(),
                            "embedding cycle, field is unsupported"
                        );
                        fields.push(FieldDescriptor::new(index, meta, self.table.unsupported()));
                        continue;
                    }
                    Some(target) => {
                        let child = self.build(&target);
                        let mut field = FieldDescriptor::new(index, meta, handlers);
                        field.embedded = Some(Arc::new(child));
                        fields.push(field);
                        continue;
                    }
                    None => tracing::warn!(
                        record = shape.type_name(),
                        field = meta.name(),
                        kind = %meta.shape().kind(),
                        "embedded flag on a non-record field ignored"
                    ),
                }
            }

            // Nested (non-embedded) records bind their own keys when they are
            // traversed, so only leaf fields claim a key here.
            if meta.shape().composite().is_none() && !self.claimed.insert(meta.key()) {
                tracing::warn!(
                    record = shape.type_name(),
                    field = meta.name(),
                    key = meta.key(),
                    "key already bound by an earlier field, field skipped"
                );
                continue;
            }

            fields.push(FieldDescriptor::new(index, meta, handlers));
        }

        self.building.pop();
        FieldDescriptorList {
            type_id: shape.type_id(),
            type_name: shape.type_name(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DISPATCH;
    use crate::reflect::{DynValue, Kind, Typed};

    #[derive(Debug, Default)]
    struct Tls {
        cert: String,
        verify: bool,
    }

    crate::record!(Tls {
        cert: "TLS_CERT",
        verify: "TLS_VERIFY",
    });

    #[derive(Debug, Default)]
    struct Server {
        host: String,
        tls: Tls,
        backup: Option<Box<Tls>>,
        port: u16,
    }

    crate::record!(Server {
        host: "HOST" => required,
        tls => embedded,
        backup => embedded,
        port: "PORT",
    });

    #[derive(Debug, Default)]
    struct Shadowed {
        tls: Tls,
        cert: String,
        port: u16,
        other_port: u16,
    }

    crate::record!(Shadowed {
        tls => embedded,
        cert: "TLS_CERT",
        port: "PORT",
        other_port: "PORT",
    });

    #[derive(Debug, Default)]
    struct Looping {
        name: String,
        next: Option<Box<Looping>>,
    }

    crate::record!(Looping {
        name: "NAME",
        next => embedded,
    });

    #[derive(Debug, Default)]
    struct Odd {
        count: u8,
        value: DynValue,
    }

    crate::record!(Odd {
        count: "COUNT" => embedded,
        value: "VALUE",
    });

    #[test]
    fn built_once_and_shared() {
        let cache = DescriptorCache::new(&DISPATCH);
        let a = cache.descriptors_for(&Server::type_shape());
        let b = cache.descriptors_for(&Server::type_shape());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn declaration_order_and_embedding() {
        let cache = DescriptorCache::new(&DISPATCH);
        let list = cache.descriptors_for(&Server::type_shape());
        assert_eq!(list.type_name(), "Server");

        let names: Vec<_> = list.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["host", "tls", "backup", "port"]);

        let host = &list.fields[0];
        assert!(host.is_mandatory());
        assert!(host.embedded().is_none());

        let tls = list.fields[1].embedded().map(|l| l.type_name());
        assert_eq!(tls, Some("Tls"));
        assert_eq!(list.fields[2].index(), 2);
    }

    #[test]
    fn embedded_keys_claim_first() {
        let cache = DescriptorCache::new(&DISPATCH);
        let list = cache.descriptors_for(&Server::type_shape());
        // backup embeds Tls again; its keys lose to the first embedding.
        assert_eq!(list.keys(), ["HOST", "TLS_CERT", "TLS_VERIFY", "PORT"]);
        assert!(list.fields[2].embedded().is_some_and(|l| l.is_empty()));
    }

    #[test]
    fn first_descriptor_wins_collisions() {
        let cache = DescriptorCache::new(&DISPATCH);
        let list = cache.descriptors_for(&Shadowed::type_shape());
        let names: Vec<_> = list.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["tls", "port"]);
        assert_eq!(list.keys(), ["TLS_CERT", "TLS_VERIFY", "PORT"]);
    }

    #[test]
    fn standalone_embedded_type_keeps_its_keys() {
        let cache = DescriptorCache::new(&DISPATCH);
        cache.descriptors_for(&Shadowed::type_shape());
        let tls = cache.descriptors_for(&Tls::type_shape());
        assert_eq!(tls.keys(), ["TLS_CERT", "TLS_VERIFY"]);
    }

    #[test]
    fn embedding_cycle_is_unsupported() {
        let cache = DescriptorCache::new(&DISPATCH);
        let list = cache.descriptors_for(&Looping::type_shape());
        assert_eq!(list.len(), 2);
        assert!(list.fields[1].embedded().is_none());
    }

    #[test]
    fn embedded_flag_on_scalar_is_ignored() {
        let cache = DescriptorCache::new(&DISPATCH);
        let list = cache.descriptors_for(&Odd::type_shape());
        assert_eq!(list.len(), 2);
        assert!(list.fields[0].embedded().is_none());
        assert_eq!(list.fields[0].key(), "COUNT");
        assert_eq!(list.fields[1].shape().kind(), Kind::Dynamic);
    }

    #[test]
    fn concurrent_first_use_builds_one_list() {
        let cache = DescriptorCache::new(&DISPATCH);
        let lists: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.descriptors_for(&Server::type_shape())))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for list in &lists[1..] {
            assert!(Arc::ptr_eq(&lists[0], list));
        }
        assert_eq!(cache.len(), 1);
    }
}
