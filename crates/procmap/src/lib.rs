//! # procmap
//!
//! Maps the rows returned by stored routines and prepared statements onto
//! plain Rust structs, and turns structs back into named parameters.
//!
//! ## Features
//!
//! - **Declared, not reflected**: each type describes its fields once (usually via
//!   `#[derive(Entity)]`); accessors are plain function pointers cached per type
//! - **Tolerant loading**: columns the result does not carry and NULL cells leave
//!   the field as it was
//! - **CRUD directions**: per-field `create|read|update|delete|dont_use` filters for
//!   both loading and parameter synthesis
//! - **Object graphs**: stitch children onto parents from sequential result sets or
//!   from one flattened join
//! - **Blocking or async**: [`Mapper`] over an [`Executor`], [`AsyncMapper`] over an
//!   [`AsyncExecutor`]; PostgreSQL support via [`PgExecutor`]
//!
//! ## Example
//!
//! ```ignore
//! use procmap::prelude::*;
//!
//! #[derive(Debug, Default, Clone, Entity)]
//! struct Customer {
//!     #[orm(identity)]
//!     id: i64,
//!     name: String,
//!     orders: Vec<Order>,
//! }
//!
//! #[derive(Debug, Default, Clone, Entity)]
//! struct Order {
//!     #[orm(identity)]
//!     id: i64,
//!     #[orm(foreign_key = "id")]
//!     customer_id: i64,
//! }
//!
//! let mapper = AsyncMapper::new(PgExecutor::new(create_pool(&url)?));
//! let customers: Vec<Customer> = mapper
//!     .fetch_related::<Customer, Order>(
//!         &Command::procedure("customers_with_orders").returns_cursors(),
//!     )
//!     .await?;
//! ```

pub mod columns;
pub mod command;
pub mod config;
pub mod crud;
pub mod cursor;
pub mod entity;
pub mod error;
pub mod executor;
pub mod join;
pub mod loader;
pub mod mapper;
pub mod meta;
mod once_map;
pub mod page;
pub mod params;
pub mod pool;
pub mod prelude;
pub mod relation;
pub mod value;

#[cfg(feature = "postgres")]
pub mod pg;

pub use columns::{ColumnNameCache, ColumnNames};
pub use command::{Command, CommandKind, PageRequest, Param, ParamDirection};
pub use config::MapperConfig;
pub use crud::Crud;
pub use cursor::{AsyncRowCursor, MemoryCursor, ResultSet, RowCursor, RowValues};
pub use entity::{
    Cardinality, ChildSlot, Entity, EntityDescriptor, FieldDef, ForeignKey, Getter, Setter,
};
pub use error::{ConfigError, MapError, MapResult, OrmError, OrmResult};
pub use executor::{AsyncExecutor, Executor};
pub use join::JoinedSet;
pub use loader::{RowLoader, load_row};
pub use mapper::{AsyncMapper, Mapper};
pub use meta::{EntityMeta, FieldMeta, cached_entity_count, metadata};
pub use page::ObjectListResult;
pub use params::to_parameters;
pub use pool::{HandlePool, Pooled};
pub use relation::{Relation, correlate};
pub use value::{FieldValue, Json, Value, ValueKind};

#[cfg(feature = "postgres")]
pub use pg::{PgCursor, PgExecutor};

#[cfg(feature = "postgres")]
pub use pool::{create_pool, create_pool_with_config, create_pool_with_manager_config};

#[cfg(feature = "derive")]
pub use procmap_derive::Entity;
