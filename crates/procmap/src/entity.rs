//! Per-type descriptors.
//!
//! An [`EntityDescriptor`] is the tagged field list of a mapped type: which fields
//! exist, how to read and write them, their column overrides and CRUD
//! annotations, and which fields hold child objects. It is normally produced by
//! `#[derive(Entity)]`, but can be written by hand:
//!
//! ```ignore
//! impl Entity for User {
//!     fn describe() -> EntityDescriptor<Self> {
//!         EntityDescriptor::new("User")
//!             .field(
//!                 FieldDef::<User>::of::<i64>("id")
//!                     .identity()
//!                     .getter(|u| u.id.to_value())
//!                     .setter(|u, v| {
//!                         u.id = FieldValue::from_value(v)?;
//!                         Ok(())
//!                     }),
//!             )
//!             .child(ChildSlot::<User>::many::<Post>("posts", |u| &mut u.posts))
//!     }
//! }
//! ```

use crate::crud::Crud;
use crate::error::OrmResult;
use crate::value::{FieldValue, Value, ValueKind};
use std::any::{Any, TypeId};
use std::fmt;

/// Synthesized getter.
pub type Getter<T> = fn(&T) -> Value;

/// Synthesized setter.
pub type Setter<T> = fn(&mut T, Value) -> OrmResult<()>;

/// A type whose rows can be mapped by the engine.
///
/// `describe` runs once per process; its result is cached by [`crate::metadata`].
pub trait Entity: Default + Clone + Send + Sync + 'static {
    fn describe() -> EntityDescriptor<Self>;
}

/// Declared foreign key: the parent field this field must equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Parent type name, when the declaration was qualified (`"Department.id"`).
    pub parent: Option<&'static str>,
    /// Parent field name.
    pub target: &'static str,
}

impl ForeignKey {
    /// Parse `"field"` or `"Type.field"`.
    pub fn parse(decl: &'static str) -> ForeignKey {
        match decl.rsplit_once('.') {
            Some((parent, target)) => ForeignKey {
                parent: Some(parent),
                target,
            },
            None => ForeignKey {
                parent: None,
                target: decl,
            },
        }
    }
}

/// One declared scalar field.
pub struct FieldDef<T> {
    pub(crate) name: &'static str,
    pub(crate) column: Option<&'static str>,
    pub(crate) crud: Option<Crud>,
    pub(crate) foreign_key: Option<ForeignKey>,
    pub(crate) identity: bool,
    pub(crate) kind: ValueKind,
    pub(crate) get: Option<Getter<T>>,
    pub(crate) set: Option<Setter<T>>,
}

impl<T> FieldDef<T> {
    pub fn new(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            column: None,
            crud: None,
            foreign_key: None,
            identity: false,
            kind,
            get: None,
            set: None,
        }
    }

    /// Declare a field whose kind is taken from its Rust type.
    pub fn of<V: FieldValue>(name: &'static str) -> Self {
        Self::new(name, V::KIND)
    }

    pub fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    pub fn crud(mut self, crud: Crud) -> Self {
        self.crud = Some(crud);
        self
    }

    /// Mark this field as the key correlating it to a parent field
    /// (`"id"` or `"Parent.id"`).
    pub fn foreign_key(mut self, target: &'static str) -> Self {
        self.foreign_key = Some(ForeignKey::parse(target));
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn getter(mut self, get: Getter<T>) -> Self {
        self.get = Some(get);
        self
    }

    pub fn setter(mut self, set: Setter<T>) -> Self {
        self.set = Some(set);
        self
    }
}

impl<T> fmt::Debug for FieldDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("crud", &self.crud)
            .field("foreign_key", &self.foreign_key)
            .field("identity", &self.identity)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Whether a child slot holds a collection or at most one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Many,
    One,
}

type Assign<T> = Box<dyn Fn(&mut T, Box<dyn Any>) + Send + Sync>;

/// A field holding child objects of another entity type.
pub struct ChildSlot<T> {
    pub(crate) name: &'static str,
    pub(crate) element: TypeId,
    pub(crate) element_name: &'static str,
    pub(crate) cardinality: Cardinality,
    assign: Assign<T>,
}

impl<T: 'static> ChildSlot<T> {
    /// A `Vec<C>` slot.
    pub fn many<C: Entity>(name: &'static str, slot: fn(&mut T) -> &mut Vec<C>) -> Self {
        Self {
            name,
            element: TypeId::of::<C>(),
            element_name: std::any::type_name::<C>(),
            cardinality: Cardinality::Many,
            assign: Box::new(move |parent, children| {
                if let Ok(children) = children.downcast::<Vec<C>>() {
                    *slot(parent) = *children;
                }
            }),
        }
    }

    /// An `Option<C>` slot.
    pub fn one<C: Entity>(name: &'static str, slot: fn(&mut T) -> &mut Option<C>) -> Self {
        Self {
            name,
            element: TypeId::of::<C>(),
            element_name: std::any::type_name::<C>(),
            cardinality: Cardinality::One,
            assign: Box::new(move |parent, child| {
                if let Ok(child) = child.downcast::<Option<C>>() {
                    *slot(parent) = *child;
                }
            }),
        }
    }

    pub(crate) fn assign_many<C: 'static>(&self, parent: &mut T, children: Vec<C>) {
        (self.assign)(parent, Box::new(children));
    }

    pub(crate) fn assign_one<C: 'static>(&self, parent: &mut T, child: Option<C>) {
        (self.assign)(parent, Box::new(child));
    }
}

impl<T> ChildSlot<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn holds<C: 'static>(&self) -> bool {
        self.element == TypeId::of::<C>()
    }
}

impl<T> fmt::Debug for ChildSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSlot")
            .field("name", &self.name)
            .field("element", &self.element_name)
            .field("cardinality", &self.cardinality)
            .finish()
    }
}

/// The tagged field list of an entity type.
#[derive(Debug)]
pub struct EntityDescriptor<T> {
    pub(crate) type_name: &'static str,
    pub(crate) prefix: Option<&'static str>,
    pub(crate) fields: Vec<FieldDef<T>>,
    pub(crate) children: Vec<ChildSlot<T>>,
}

impl<T> EntityDescriptor<T> {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            prefix: None,
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Column prefix used in flattened joins. Defaults to the type name.
    pub fn prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn field(mut self, field: FieldDef<T>) -> Self {
        self.fields.push(field);
        self
    }

    pub fn child(mut self, slot: ChildSlot<T>) -> Self {
        self.children.push(slot);
        self
    }
}
