//! Application services layer.

pub mod content;
pub mod content_cache;
pub mod error;
pub mod posts;
pub mod render;
