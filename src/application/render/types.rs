use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Identifies the document in logs, e.g. `posts/hello-world/en.md`.
    pub document: String,
    /// Markdown source, front matter included.
    pub markdown: String,
}

impl RenderRequest {
    pub fn new(document: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            markdown: markdown.into(),
        }
    }
}

/// Heading captured for the navigation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub id: String,
    pub level: u8,
    /// Heading text, HTML escaped, whitespace collapsed.
    pub text: String,
}

impl NavEntry {
    /// Markup handed to the page as one navigation item.
    pub fn to_html(&self) -> String {
        format!(
            "<span data-id=\"{}\" data-level=\"{}\">{}</span>",
            ammonia::clean_text(&self.id),
            self.level,
            self.text
        )
    }
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Document body without the navigation.
    pub html: String,
    /// Headings with ids, in document order.
    pub nav: Vec<NavEntry>,
    pub contains_code: bool,
}

impl RenderOutput {
    pub fn nav_list(&self) -> Vec<String> {
        self.nav.iter().map(NavEntry::to_html).collect()
    }
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("markdown parsing failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("code block metadata is malformed: {message}")]
    CodeMeta { message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
