mod config;
mod headings;
mod highlight;
mod meta;
mod rewrite;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::application::render::types::{RenderError, RenderOutput, RenderRequest, RenderService};

use config::default_options;
use headings::{AnchoredHtml, anchor_headings};
use highlight::CodeHighlighter;
use rewrite::rewrite_ast;

pub use highlight::{DARK_THEME, LIGHT_THEME};

/// Comrak-based pipeline with dual-theme Syntect highlighting.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    highlighter: CodeHighlighter,
}

impl ComrakRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            highlighter: CodeHighlighter::new(),
        }
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
///
/// Loading syntaxes and themes is expensive; call from a blocking context.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let rewrite_outcome = rewrite_stage(root, &self.highlighter)?;
        let rendered_html = render_html_stage(root, &self.options)?;
        let AnchoredHtml { html, nav } = anchor_headings(&rendered_html)?;

        debug!(
            target = "application::render",
            document = %request.document,
            code_blocks = rewrite_outcome.code_blocks,
            headings = nav.len(),
            "Rendered markdown document"
        );

        Ok(RenderOutput {
            html,
            nav,
            contains_code: rewrite_outcome.code_blocks > 0,
        })
    }
}

fn rewrite_stage<'a>(
    root: &'a AstNode<'a>,
    highlighter: &CodeHighlighter,
) -> Result<rewrite::RewriteOutcome, RenderError> {
    rewrite_ast(root, highlighter)
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}
