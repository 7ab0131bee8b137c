//! bookmarks-server: REST service for bookmarks and tags
//!
//! Clients create, read, update, delete, search and tag-filter bookmarks
//! through paginated JSON endpoints backed by Postgres.

pub mod db;
pub mod http;
pub mod models;
pub mod service;

pub use db::{BookmarkStore, DbError, MemoryStore, PgStore};
pub use http::{build_router, run_server, AppState, ServerConfig};
pub use service::BookmarkService;
