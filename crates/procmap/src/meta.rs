//! Per-type metadata cache.
//!
//! [`metadata`] turns an [`Entity`]'s descriptor into an indexed, immutable
//! [`EntityMeta`] the first time the type is used, and hands out the same
//! `&'static` entry for the rest of the process.

use crate::crud::Crud;
use crate::entity::{ChildSlot, Entity, ForeignKey, Getter, Setter};
use crate::error::OrmResult;
use crate::once_map::OnceMap;
use crate::value::{Value, ValueKind};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Metadata of one mapped field.
pub struct FieldMeta<T> {
    name: &'static str,
    column: &'static str,
    column_override: Option<&'static str>,
    crud: Option<Crud>,
    foreign_key: Option<ForeignKey>,
    identity: bool,
    kind: ValueKind,
    get: Option<Getter<T>>,
    set: Option<Setter<T>>,
}

impl<T> FieldMeta<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Effective column name: the override if declared, else the field name.
    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn column_override(&self) -> Option<&'static str> {
        self.column_override
    }

    pub fn crud(&self) -> Option<Crud> {
        self.crud
    }

    pub fn foreign_key(&self) -> Option<ForeignKey> {
        self.foreign_key
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn has_getter(&self) -> bool {
        self.get.is_some()
    }

    pub fn has_setter(&self) -> bool {
        self.set.is_some()
    }

    /// Whether the field takes part in `direction`. Unannotated fields take part
    /// in every direction.
    pub fn admits(&self, direction: Crud) -> bool {
        self.crud.is_none_or(|crud| crud.admits(direction))
    }

    pub fn is_readable(&self) -> bool {
        self.admits(Crud::READ)
    }

    pub fn get(&self, source: &T) -> Option<Value> {
        self.get.map(|get| get(source))
    }

    pub(crate) fn setter(&self) -> Option<Setter<T>> {
        self.set
    }

    pub fn set(&self, target: &mut T, value: Value) -> OrmResult<bool> {
        match self.set {
            Some(set) => set(target, value).map(|()| true),
            None => Ok(false),
        }
    }
}

impl<T> fmt::Debug for FieldMeta<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMeta")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("crud", &self.crud)
            .field("foreign_key", &self.foreign_key)
            .field("identity", &self.identity)
            .field("kind", &self.kind)
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}

/// Cached metadata of an entity type. Immutable once published.
pub struct EntityMeta<T> {
    type_name: &'static str,
    rust_type: &'static str,
    prefix: &'static str,
    fields: Vec<FieldMeta<T>>,
    children: Vec<ChildSlot<T>>,
    by_name: HashMap<&'static str, usize>,
    by_column: HashMap<&'static str, usize>,
    getters: HashMap<&'static str, Getter<T>>,
    setters: HashMap<&'static str, Setter<T>>,
    foreign_keys: HashMap<&'static str, Vec<usize>>,
    identities: HashMap<&'static str, usize>,
    identity: Option<usize>,
}

impl<T: Entity> EntityMeta<T> {
    fn build() -> Self {
        let descriptor = T::describe();
        let mut meta = EntityMeta {
            type_name: descriptor.type_name,
            rust_type: std::any::type_name::<T>(),
            prefix: descriptor.prefix.unwrap_or(descriptor.type_name),
            fields: Vec::with_capacity(descriptor.fields.len()),
            children: descriptor.children,
            by_name: HashMap::new(),
            by_column: HashMap::new(),
            getters: HashMap::new(),
            setters: HashMap::new(),
            foreign_keys: HashMap::new(),
            identities: HashMap::new(),
            identity: None,
        };

        for (idx, def) in descriptor.fields.into_iter().enumerate() {
            let column = def.column.unwrap_or(def.name);
            meta.by_name.insert(def.name, idx);
            meta.by_column.entry(column).or_insert(idx);
            if let Some(get) = def.get {
                meta.getters.insert(def.name, get);
            }
            if let Some(set) = def.set {
                meta.setters.insert(def.name, set);
            }
            if let Some(fk) = def.foreign_key {
                meta.foreign_keys.entry(fk.target).or_default().push(idx);
            }
            if def.identity {
                meta.identities.insert(def.name, idx);
                meta.identity.get_or_insert(idx);
            }
            meta.fields.push(FieldMeta {
                name: def.name,
                column,
                column_override: def.column,
                crud: def.crud,
                foreign_key: def.foreign_key,
                identity: def.identity,
                kind: def.kind,
                get: def.get,
                set: def.set,
            });
        }

        tracing::debug!(
            target: "procmap.meta",
            type_name = meta.rust_type,
            fields = meta.fields.len(),
            children = meta.children.len(),
            "built entity metadata"
        );
        meta
    }
}

impl<T> EntityMeta<T> {
    /// Declared (short) type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fully qualified Rust type name.
    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    /// Column prefix for flattened joins.
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Scalar fields in declaration order.
    pub fn fields(&self) -> &[FieldMeta<T>] {
        &self.fields
    }

    pub fn children(&self) -> &[ChildSlot<T>] {
        &self.children
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta<T>> {
        self.by_name.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn field_by_column(&self, column: &str) -> Option<&FieldMeta<T>> {
        self.by_column.get(column).map(|&idx| &self.fields[idx])
    }

    pub fn getter(&self, name: &str) -> Option<Getter<T>> {
        self.getters.get(name).copied()
    }

    pub fn setter(&self, name: &str) -> Option<Setter<T>> {
        self.setters.get(name).copied()
    }

    /// Foreign-key fields declaring `target` as the parent field they correlate against.
    pub fn foreign_keys_to(&self, target: &str) -> impl Iterator<Item = &FieldMeta<T>> {
        self.foreign_keys
            .get(target)
            .into_iter()
            .flatten()
            .map(|&idx| &self.fields[idx])
    }

    /// All foreign-key fields in declaration order.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &FieldMeta<T>> {
        self.fields.iter().filter(|f| f.foreign_key.is_some())
    }

    /// First identity field in declaration order.
    pub fn identity(&self) -> Option<&FieldMeta<T>> {
        self.identity.map(|idx| &self.fields[idx])
    }

    pub fn is_identity(&self, name: &str) -> bool {
        self.identities.contains_key(name)
    }

    /// First `Many` slot holding `C`, else the first `One` slot holding `C`.
    pub fn child_slot_for<C: 'static>(&self) -> Option<&ChildSlot<T>> {
        use crate::entity::Cardinality;

        self.children
            .iter()
            .find(|slot| slot.cardinality == Cardinality::Many && slot.holds::<C>())
            .or_else(|| {
                self.children
                    .iter()
                    .find(|slot| slot.cardinality == Cardinality::One && slot.holds::<C>())
            })
    }
}

impl<T> fmt::Debug for EntityMeta<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMeta")
            .field("type_name", &self.type_name)
            .field("prefix", &self.prefix)
            .field("fields", &self.fields)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

type ErasedMeta = &'static (dyn Any + Send + Sync);

fn registry() -> &'static OnceMap<TypeId, ErasedMeta> {
    static ENTITIES: OnceLock<OnceMap<TypeId, ErasedMeta>> = OnceLock::new();
    ENTITIES.get_or_init(OnceMap::new)
}

/// Metadata for `T`, built on first use and shared for the life of the process.
pub fn metadata<T: Entity>() -> &'static EntityMeta<T> {
    let erased = registry().get_or_init(TypeId::of::<T>(), || {
        let leaked: &'static EntityMeta<T> = Box::leak(Box::new(EntityMeta::<T>::build()));
        leaked as ErasedMeta
    });
    erased
        .downcast_ref::<EntityMeta<T>>()
        .expect("entity registry is keyed by TypeId")
}

/// Number of entity types whose metadata has been built.
pub fn cached_entity_count() -> usize {
    registry().len()
}
