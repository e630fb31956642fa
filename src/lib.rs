//! Folio: content cache and Markdown render pipeline for a multilingual blog.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
