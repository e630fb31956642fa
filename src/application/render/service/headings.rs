//! Heading ids, permalinks and the navigation list.
//!
//! Runs over serialized HTML so headings written as raw HTML are treated the
//! same as Markdown ones. The first pass records every heading, the second
//! assigns ids and prepends the permalink anchor.

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str, text};

use crate::application::render::types::{NavEntry, RenderError};
use crate::domain::slug::AnchorSlugger;

const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

#[derive(Debug, Clone, Default)]
struct ScannedHeading {
    level: u8,
    existing_id: Option<String>,
    text: String,
}

#[derive(Debug, Clone)]
struct PlannedHeading {
    id: Option<String>,
    assign: bool,
}

pub(crate) struct AnchoredHtml {
    pub(crate) html: String,
    pub(crate) nav: Vec<NavEntry>,
}

pub(crate) fn anchor_headings(html: &str) -> Result<AnchoredHtml, RenderError> {
    let scanned = scan_headings(html)?;

    let mut slugger = AnchorSlugger::new();
    for heading in &scanned {
        if let Some(id) = heading.existing_id.as_deref() {
            slugger.reserve(id);
        }
    }

    let mut plans = Vec::with_capacity(scanned.len());
    let mut nav = Vec::new();
    for heading in &scanned {
        let text = collapse_whitespace(&heading.text);
        let plan = match heading.existing_id.clone() {
            Some(id) => PlannedHeading {
                id: Some(id),
                assign: false,
            },
            None => PlannedHeading {
                id: slugger.anchor_for(&decode_entities(&text)),
                assign: true,
            },
        };
        if let Some(id) = plan.id.clone() {
            nav.push(NavEntry {
                id,
                level: heading.level,
                text,
            });
        }
        plans.push(plan);
    }

    let html = apply_anchors(html, plans)?;
    Ok(AnchoredHtml { html, nav })
}

fn scan_headings(html: &str) -> Result<Vec<ScannedHeading>, RenderError> {
    let headings = Rc::new(RefCell::new(Vec::<ScannedHeading>::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(HEADING_SELECTOR, {
                    let headings = Rc::clone(&headings);
                    move |el| {
                        let level = heading_level(&el.tag_name());
                        let existing_id = el.get_attribute("id").filter(|id| !id.trim().is_empty());
                        headings.borrow_mut().push(ScannedHeading {
                            level,
                            existing_id,
                            text: String::new(),
                        });
                        Ok(())
                    }
                }),
                text!(HEADING_SELECTOR, {
                    let headings = Rc::clone(&headings);
                    move |chunk| {
                        if let Some(current) = headings.borrow_mut().last_mut() {
                            current.text.push_str(chunk.as_str());
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    let scanned = headings.borrow().clone();
    Ok(scanned)
}

fn apply_anchors(html: &str, plans: Vec<PlannedHeading>) -> Result<String, RenderError> {
    let plans = Rc::new(plans);
    let index = Rc::new(RefCell::new(0usize));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(HEADING_SELECTOR, {
                let plans = Rc::clone(&plans);
                let index = Rc::clone(&index);
                move |el| {
                    let mut idx = index.borrow_mut();
                    let Some(plan) = plans.get(*idx) else {
                        return Ok(());
                    };
                    *idx += 1;

                    if let Some(id) = plan.id.as_deref() {
                        if plan.assign {
                            el.set_attribute("id", id)?;
                        }
                        el.prepend(&permalink(id), ContentType::Html);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })
}

fn permalink(id: &str) -> String {
    format!(
        "<a aria-hidden=\"true\" tabindex=\"-1\" href=\"#{}\"><span class=\"icon icon-link\"></span></a>",
        ammonia::clean_text(id)
    )
}

fn heading_level(tag_name: &str) -> u8 {
    tag_name
        .strip_prefix('h')
        .and_then(|value| value.parse::<u8>().ok())
        .unwrap_or(0)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes the character references lol_html leaves in text chunks.
///
/// Numeric references are fully supported. Named references cover the markup
/// escapes comrak emits plus common typographic punctuation; anything else is
/// left verbatim and slugs as its name.
fn decode_entities(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match candidate.find(';').filter(|end| *end <= 10) {
            Some(end) => match decode_reference(&candidate[1..end]) {
                Some(ch) => {
                    decoded.push(ch);
                    rest = &candidate[end + 1..];
                }
                None => {
                    decoded.push('&');
                    rest = &candidate[1..];
                }
            },
            None => {
                decoded.push('&');
                rest = &candidate[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "lsquo" => Some('‘'),
        "rsquo" => Some('’'),
        "ldquo" => Some('“'),
        "rdquo" => Some('”'),
        "laquo" => Some('«'),
        "raquo" => Some('»'),
        "middot" => Some('·'),
        "bull" => Some('•'),
        "times" => Some('×'),
        "deg" => Some('°'),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "trade" => Some('™'),
        "euro" => Some('€'),
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
