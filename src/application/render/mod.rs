//! Markdown render pipeline.
//!
//! Pure with respect to its input: Markdown (front matter included) goes in,
//! HTML plus the heading navigation comes out. Stages run in a fixed order:
//! parse, highlight code blocks, serialize, then assign heading anchors and
//! collect the navigation.

mod service;
mod types;

pub use service::{ComrakRenderService, DARK_THEME, LIGHT_THEME, render_service};
pub use types::{NavEntry, RenderError, RenderOutput, RenderRequest, RenderService};
