//! Database layer - connection pool, schema and bookmark stores
//!
//! # Design Principles
//!
//! - Connection pool, no Arc<Mutex<Connection>>
//! - List operations aggregate tags with JOINs - no N+1 queries
//! - Rely on DB constraints, handle conflicts - no check-then-insert
//! - One transaction per write operation

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use pool::{create_pool, create_pool_with_options};
pub use postgres::PgStore;
pub use store::{BookmarkStore, DbError};
