//! Code fence metadata: `filename=app.ts lines={2,4-5} nonumber`.

use std::ops::RangeInclusive;

use crate::application::render::types::RenderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CodeMeta {
    pub(crate) filename: Option<String>,
    /// 1-indexed line ranges to emphasise.
    pub(crate) highlighted: Vec<RangeInclusive<u32>>,
    pub(crate) numbered: bool,
}

impl Default for CodeMeta {
    fn default() -> Self {
        Self {
            filename: None,
            highlighted: Vec::new(),
            numbered: true,
        }
    }
}

impl CodeMeta {
    pub(crate) fn is_highlighted(&self, line: u32) -> bool {
        self.highlighted.iter().any(|range| range.contains(&line))
    }
}

/// Parses the part of the info string after the language token.
///
/// Unknown keys are ignored. A malformed `lines` value is an error.
pub(crate) fn parse_code_meta(meta: &str) -> Result<CodeMeta, RenderError> {
    let mut parsed = CodeMeta::default();

    for token in meta.split_whitespace() {
        match token.split_once('=') {
            Some(("filename", value)) => {
                let value = value.trim_matches('"');
                if !value.is_empty() {
                    parsed.filename = Some(value.to_string());
                }
            }
            Some(("lines", value)) => parsed.highlighted = parse_line_set(value)?,
            Some(_) => {}
            None if token == "nonumber" => parsed.numbered = false,
            None => {}
        }
    }

    Ok(parsed)
}

fn parse_line_set(value: &str) -> Result<Vec<RangeInclusive<u32>>, RenderError> {
    let inner = value
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| meta_error(format!("`lines` expects `{{a,b-c}}`, got `{value}`")))?;

    let mut lines = Vec::new();
    for part in inner.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_line_number(start)?;
                let end = parse_line_number(end)?;
                if end < start {
                    return Err(meta_error(format!("descending line range `{part}`")));
                }
                lines.push(start..=end);
            }
            None => {
                let line = parse_line_number(part)?;
                lines.push(line..=line);
            }
        }
    }

    Ok(lines)
}

fn parse_line_number(raw: &str) -> Result<u32, RenderError> {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(meta_error(format!("invalid line number `{raw}`"))),
        Ok(line) => Ok(line),
    }
}

fn meta_error(message: String) -> RenderError {
    RenderError::CodeMeta { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_meta_numbers_lines() {
        let meta = parse_code_meta("").expect("meta");
        assert_eq!(meta, CodeMeta::default());
        assert!(meta.numbered);
    }

    #[test]
    fn parses_ranges_and_singles() {
        let meta = parse_code_meta("lines={2,4-5}").expect("meta");
        assert_eq!(meta.highlighted, vec![2..=2, 4..=5]);
        let marked: Vec<u32> = (1..=6).filter(|line| meta.is_highlighted(*line)).collect();
        assert_eq!(marked, vec![2, 4, 5]);
    }

    #[test]
    fn huge_ranges_are_stored_as_bounds() {
        let meta = parse_code_meta("lines={1-4000000000}").expect("meta");
        assert_eq!(meta.highlighted, vec![1..=4_000_000_000]);
        assert!(meta.is_highlighted(3_999_999_999));
        assert!(!meta.is_highlighted(4_000_000_001));
    }

    #[test]
    fn parses_filename_and_nonumber() {
        let meta = parse_code_meta("filename=src/app.ts nonumber").expect("meta");
        assert_eq!(meta.filename.as_deref(), Some("src/app.ts"));
        assert!(!meta.numbered);
    }

    #[test]
    fn ignores_unknown_keys() {
        let meta = parse_code_meta("title=x showLineNumbers").expect("meta");
        assert_eq!(meta, CodeMeta::default());
    }

    #[test]
    fn malformed_lines_are_errors() {
        for input in [
            "lines=2,4",
            "lines={a}",
            "lines={0}",
            "lines={5-3}",
            "lines={1-}",
        ] {
            assert!(
                matches!(parse_code_meta(input), Err(RenderError::CodeMeta { .. })),
                "{input} should be rejected"
            );
        }
    }
}
