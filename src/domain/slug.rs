//! Anchor slugs for heading ids.
//!
//! The helpers here bridge ASCII slugification (`slug` crate) with Chinese
//! transliteration (`pinyin` crate) so headings like “基线对齐” become
//! `ji-xian-dui-qi`. Duplicates within one document get `-1`, `-2`, … in the
//! order they appear.

use std::collections::{HashMap, HashSet};

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

/// Base used when heading text has no representable characters.
const FALLBACK_BASE: &str = "section";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Deterministically generate unique anchor slugs within a single document.
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an id already present in the document so generated ones avoid it.
    pub fn reserve(&mut self, id: &str) {
        self.taken.insert(id.to_string());
    }

    /// Returns a fresh id for `heading`, or `None` when the text is blank.
    pub fn anchor_for(&mut self, heading: &str) -> Option<String> {
        let base = match derive_slug(heading) {
            Ok(base) => base,
            Err(SlugError::EmptyInput) => return None,
            Err(SlugError::Unrepresentable { .. }) => FALLBACK_BASE.to_string(),
        };

        let count = self.occurrences.entry(base.clone()).or_insert(0);
        let mut candidate = if *count == 0 {
            base.clone()
        } else {
            format!("{base}-{count}")
        };
        while self.taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{base}-{count}");
        }
        *count += 1;

        self.taken.insert(candidate.clone());
        Some(candidate)
    }
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            None => output.push(ch),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_transliterates_chinese() {
        let slug = derive_slug("Rust 基础教程").expect("slug");
        assert_eq!(slug, "rust-ji-chu-jiao-cheng");
    }

    #[test]
    fn duplicates_get_numeric_suffixes() {
        let mut slugger = AnchorSlugger::new();

        assert_eq!(slugger.anchor_for("A").as_deref(), Some("a"));
        assert_eq!(slugger.anchor_for("B").as_deref(), Some("b"));
        assert_eq!(slugger.anchor_for("A").as_deref(), Some("a-1"));
        assert_eq!(slugger.anchor_for("A").as_deref(), Some("a-2"));
    }

    #[test]
    fn suffix_skips_ids_already_used() {
        let mut slugger = AnchorSlugger::new();

        assert_eq!(slugger.anchor_for("Setup 1").as_deref(), Some("setup-1"));
        assert_eq!(slugger.anchor_for("Setup").as_deref(), Some("setup"));
        assert_eq!(slugger.anchor_for("Setup").as_deref(), Some("setup-2"));
    }

    #[test]
    fn reserved_ids_are_not_generated() {
        let mut slugger = AnchorSlugger::new();
        slugger.reserve("intro");

        assert_eq!(slugger.anchor_for("Intro").as_deref(), Some("intro-1"));
    }

    #[test]
    fn blank_text_has_no_anchor() {
        let mut slugger = AnchorSlugger::new();
        assert_eq!(slugger.anchor_for("   "), None);
    }

    #[test]
    fn symbols_only_fall_back_to_section() {
        let mut slugger = AnchorSlugger::new();

        assert_eq!(slugger.anchor_for("???").as_deref(), Some("section"));
        assert_eq!(slugger.anchor_for("!!!").as_deref(), Some("section-1"));
    }

    #[test]
    fn chinese_headings_are_readable() {
        let mut slugger = AnchorSlugger::new();
        assert_eq!(
            slugger.anchor_for("深入理解").as_deref(),
            Some("shen-ru-li-jie")
        );
    }
}
