//! Convenient imports for typical `procmap` usage.
//!
//! ```ignore
//! use procmap::prelude::*;
//! ```

pub use crate::{
    AsyncExecutor, AsyncMapper, Command, Crud, Entity, Executor, HandlePool, Json, MapError,
    MapResult, Mapper, MapperConfig, ObjectListResult, PageRequest, Value,
};

#[cfg(feature = "postgres")]
pub use crate::{PgExecutor, create_pool, create_pool_with_config};
