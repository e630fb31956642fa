use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};

use crate::application::render::types::RenderError;

use super::highlight::CodeHighlighter;
use super::meta::parse_code_meta;

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) code_blocks: usize,
}

/// Replaces every fenced or indented code block with highlighted raw HTML.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    highlighter: &CodeHighlighter,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker {
        highlighter,
        outcome: RewriteOutcome::default(),
    };
    walker.visit_nodes(root)?;
    Ok(walker.outcome)
}

struct RewriteWalker<'a> {
    highlighter: &'a CodeHighlighter,
    outcome: RewriteOutcome,
}

impl RewriteWalker<'_> {
    fn visit_nodes(&mut self, node: &AstNode<'_>) -> Result<(), RenderError> {
        if let Some((info, literal)) = extract_code_block(node) {
            let (language, meta) = match info.split_once(char::is_whitespace) {
                Some((language, meta)) => (Some(language), meta.trim()),
                None if info.is_empty() => (None, ""),
                None => (Some(info.as_str()), ""),
            };
            let meta = parse_code_meta(meta)?;
            let html = self.highlighter.highlight_block(language, &meta, &literal)?;
            self.outcome.code_blocks += 1;

            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
            return Ok(());
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next)?;
            child = next.next_sibling();
        }

        Ok(())
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        let info = block.info.trim().to_string();
        let literal = block.literal.clone();
        Some((info, literal))
    } else {
        None
    }
}
