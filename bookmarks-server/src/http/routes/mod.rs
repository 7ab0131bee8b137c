//! Route handlers organized by resource

pub mod bookmarks;
pub mod health;
pub mod tags;
