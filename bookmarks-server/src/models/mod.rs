//! Domain models
//!
//! Query input is validated when these types are built.
//! Invalid input returns ValidationError, not panic.

pub mod bookmark;
pub mod pagination;
pub mod tag;
pub mod validation;

pub use bookmark::{Bookmark, BookmarkDraft, BookmarkRequest, BookmarkResponse, DESCRIPTION_MAX_LEN};
pub use pagination::{Direction, Page, PageParams, PageRequest, Sort, SortField};
pub use tag::{Tag, TagNames};
pub use validation::ValidationError;
