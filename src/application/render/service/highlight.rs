//! Dual-theme syntax highlighting for fenced code blocks.
//!
//! Every line is parsed once and styled by both themes. Token spans carry the
//! light colour as `color` and the dark colour as `--shiki-dark`, so the page
//! switches themes with CSS only. Theme backgrounds are never emitted.

use std::fmt::Write as _;

use syntect::{
    highlighting::{Color, HighlightIterator, HighlightState, Highlighter, Theme},
    parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use two_face::theme::EmbeddedThemeName;

use crate::application::render::types::RenderError;

use super::meta::CodeMeta;

pub const LIGHT_THEME: &str = "github-light";
pub const DARK_THEME: &str = "dracula";

const COPY_BUTTON: &str = concat!(
    "<button class=\"copy-btn\">",
    "<svg class=\"copy\" viewBox=\"0 0 1024 1024\" version=\"1.1\" xmlns=\"http://www.w3.org/2000/svg\">",
    "<path d=\"M768 682.666667V170.666667a85.333333 85.333333 0 0 0-85.333333-85.333334H170.666667a85.333333 85.333333 0 0 0-85.333334 85.333334v512a85.333333 85.333333 0 0 0 85.333334 85.333333h512a85.333333 85.333333 0 0 0 85.333333-85.333333zM170.666667 170.666667h512v512H170.666667z m682.666666 85.333333v512a85.333333 85.333333 0 0 1-85.333333 85.333333H256a85.333333 85.333333 0 0 0 85.333333 85.333334h426.666667a170.666667 170.666667 0 0 0 170.666667-170.666667V341.333333a85.333333 85.333333 0 0 0-85.333334-85.333333z\"></path>",
    "</svg>",
    "<svg class=\"checked\" viewBox=\"0 0 1024 1024\" version=\"1.1\" xmlns=\"http://www.w3.org/2000/svg\">",
    "<path d=\"M677.840584 333.048305l57.882292 59.672054L504.146637 631.452579l-57.882292 59.672054-57.926294-59.672054 0.173962-0.261966-100.237959-104.33937 57.882292-59.672054 100.281961 104.33937L677.840584 333.048305zM958.70846 243.934708l0 535.9996c0 98.711186-80.08599 178.709171-178.711218 178.709171L243.998665 958.64348c-98.711186 0-178.709171-79.997985-178.709171-178.709171L65.289494 243.934708c0-98.625228 79.997985-178.579211 178.709171-178.579211l535.998577 0C878.62247 65.355497 958.70846 145.30948 958.70846 243.934708zM869.286848 288.687982c0-74.067926-59.932997-134.042879-133.910872-134.042879L288.623002 154.645103c-73.979922 0-134.000923 59.974953-134.000923 134.042879l0 446.577988c0 74.023924 60.021002 134.086881 134.000923 134.086881l446.752973 0c73.977875 0 133.910872-60.062957 133.910872-134.086881L869.286848 288.687982z\"></path>",
    "</svg>",
    "</button>"
);

/// Languages the highlighter accepts in a fence info string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CodeLanguage {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
    Json,
    Jsonc,
    Shell,
    Diff,
    PlainText,
}

impl CodeLanguage {
    pub(crate) fn from_token(token: &str) -> Option<Self> {
        let language = match token.to_ascii_lowercase().as_str() {
            "js" | "javascript" | "mjs" | "cjs" => Self::JavaScript,
            "jsx" => Self::Jsx,
            "ts" | "typescript" | "mts" | "cts" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "json" => Self::Json,
            "jsonc" => Self::Jsonc,
            "shell" | "sh" | "bash" | "zsh" | "shellscript" => Self::Shell,
            "diff" | "patch" => Self::Diff,
            "text" | "txt" | "plaintext" | "plain" => Self::PlainText,
            _ => return None,
        };
        Some(language)
    }

    fn name(self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Json => "json",
            Self::Jsonc => "jsonc",
            Self::Shell => "shell",
            Self::Diff => "diff",
            Self::PlainText => "text",
        }
    }

    /// Syntax lookups tried in order; the first one the set knows wins.
    fn syntax_candidates(self) -> &'static [&'static str] {
        match self {
            Self::JavaScript => &["js", "javascript"],
            Self::Jsx => &["jsx", "js"],
            Self::TypeScript => &["ts", "typescript", "js"],
            Self::Tsx => &["tsx", "typescriptreact", "ts", "js"],
            Self::Json | Self::Jsonc => &["json"],
            Self::Shell => &["sh", "bash"],
            Self::Diff => &["diff"],
            Self::PlainText => &[],
        }
    }
}

/// Owns the syntax set and both themes for the lifetime of the process.
pub(crate) struct CodeHighlighter {
    syntax_set: SyntaxSet,
    light: Theme,
    dark: Theme,
}

impl CodeHighlighter {
    pub(crate) fn new() -> Self {
        let themes = two_face::theme::extra();
        Self {
            syntax_set: two_face::syntax::extra_newlines(),
            light: themes.get(EmbeddedThemeName::Github).clone(),
            dark: themes.get(EmbeddedThemeName::Dracula).clone(),
        }
    }

    /// Renders a complete `<pre>` block for `code`.
    ///
    /// `language` is the first info string token; `None` means plain text.
    pub(crate) fn highlight_block(
        &self,
        language: Option<&str>,
        meta: &CodeMeta,
        code: &str,
    ) -> Result<String, RenderError> {
        let language = match language {
            None => CodeLanguage::PlainText,
            Some(token) => {
                CodeLanguage::from_token(token).ok_or_else(|| RenderError::Highlighting {
                    language: token.to_string(),
                    message: "language is not loaded".to_string(),
                })?
            }
        };
        let syntax = self.find_syntax(language);
        let lines = self.highlight_lines(syntax, code).map_err(|message| {
            RenderError::Highlighting {
                language: language.name().to_string(),
                message,
            }
        })?;

        let mut html = String::with_capacity(code.len() * 4);
        let _ = write!(
            html,
            "<pre class=\"shiki shiki-themes {LIGHT_THEME} {DARK_THEME}\" style=\"color:{};--shiki-dark:{}\" tabindex=\"0\"",
            theme_foreground(&self.light),
            theme_foreground(&self.dark),
        );
        if let Some(filename) = meta.filename.as_deref() {
            let _ = write!(html, " data-filename=\"{}\"", ammonia::clean_text(filename));
        }
        let _ = write!(html, " data-language=\"{}\"><code>", language.name());

        for (index, tokens) in lines.iter().enumerate() {
            let number = (index + 1) as u32;
            if index > 0 {
                html.push('\n');
            }
            html.push_str("<span class=\"line");
            if meta.is_highlighted(number) {
                html.push_str(" highlight");
            }
            html.push('"');
            if meta.numbered {
                let _ = write!(html, " data-line=\"{number}\"");
            }
            html.push('>');
            html.push_str(tokens);
            html.push_str("</span>");
        }

        html.push_str("</code>");
        html.push_str(COPY_BUTTON);
        html.push_str("</pre>");
        Ok(html)
    }

    fn find_syntax(&self, language: CodeLanguage) -> &SyntaxReference {
        language
            .syntax_candidates()
            .iter()
            .find_map(|token| find_syntax(&self.syntax_set, token))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    /// Token markup per source line, trailing newlines stripped.
    fn highlight_lines(
        &self,
        syntax: &SyntaxReference,
        code: &str,
    ) -> Result<Vec<String>, String> {
        let light = Highlighter::new(&self.light);
        let dark = Highlighter::new(&self.dark);
        let mut light_state = HighlightState::new(&light, ScopeStack::new());
        let mut dark_state = HighlightState::new(&dark, ScopeStack::new());
        let mut parse_state = ParseState::new(syntax);

        let mut lines = Vec::new();
        for line in LinesWithEndings::from(code) {
            let ops = parse_state
                .parse_line(line, &self.syntax_set)
                .map_err(|err| err.to_string())?;
            let light_tokens = HighlightIterator::new(&mut light_state, &ops, line, &light);
            let dark_tokens = HighlightIterator::new(&mut dark_state, &ops, line, &dark);

            let mut rendered = String::new();
            for ((light_style, text), (dark_style, dark_text)) in light_tokens.zip(dark_tokens) {
                if text.len() != dark_text.len() {
                    return Err("theme token boundaries diverged".to_string());
                }
                let text = text.trim_end_matches(['\n', '\r']);
                if text.is_empty() {
                    continue;
                }
                let _ = write!(
                    rendered,
                    "<span style=\"color:{};--shiki-dark:{}\">{}</span>",
                    css_color(light_style.foreground),
                    css_color(dark_style.foreground),
                    escape_text(text)
                );
            }
            lines.push(rendered);
        }

        Ok(lines)
    }
}

fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    syntax_set
        .find_syntax_by_token(token)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(token))
}

fn theme_foreground(theme: &Theme) -> String {
    theme
        .settings
        .foreground
        .map(css_color)
        .unwrap_or_else(|| "inherit".to_string())
}

fn css_color(color: Color) -> String {
    if color.a == 0xFF {
        format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
    } else {
        format!(
            "#{:02X}{:02X}{:02X}{:02X}",
            color.r, color.g, color.b, color.a
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighter() -> CodeHighlighter {
        CodeHighlighter::new()
    }

    #[test]
    fn accepts_known_aliases() {
        assert_eq!(CodeLanguage::from_token("TS"), Some(CodeLanguage::TypeScript));
        assert_eq!(CodeLanguage::from_token("zsh"), Some(CodeLanguage::Shell));
        assert_eq!(CodeLanguage::from_token("jsonc"), Some(CodeLanguage::Jsonc));
        assert_eq!(CodeLanguage::from_token("rust"), None);
    }

    #[test]
    fn unknown_language_is_an_error() {
        let err = highlighter()
            .highlight_block(Some("cobol"), &CodeMeta::default(), "DISPLAY 'HI'.\n")
            .expect_err("cobol is not loaded");
        assert!(matches!(err, RenderError::Highlighting { language, .. } if language == "cobol"));
    }

    #[test]
    fn every_line_is_numbered_by_default() {
        let html = highlighter()
            .highlight_block(Some("js"), &CodeMeta::default(), "let a = 1;\nlet b = 2;\n")
            .expect("highlight");

        assert!(html.contains("data-line=\"1\""));
        assert!(html.contains("data-line=\"2\""));
        assert!(!html.contains("data-line=\"3\""));
        assert_eq!(html.matches("<span class=\"line").count(), 2);
    }

    #[test]
    fn highlighted_lines_get_class() {
        let meta = CodeMeta {
            highlighted: vec![2..=2],
            ..CodeMeta::default()
        };
        let html = highlighter()
            .highlight_block(Some("ts"), &meta, "a\nb\nc\n")
            .expect("highlight");

        assert_eq!(html.matches("class=\"line highlight\"").count(), 1);
        assert!(html.contains("<span class=\"line highlight\" data-line=\"2\">"));
    }

    #[test]
    fn tokens_carry_both_theme_colours_without_background() {
        let html = highlighter()
            .highlight_block(Some("json"), &CodeMeta::default(), "{\"a\": 1}\n")
            .expect("highlight");

        assert!(html.contains("--shiki-dark:#"));
        assert!(html.contains("shiki-themes github-light dracula"));
        assert!(!html.contains("background"));
    }

    #[test]
    fn copy_button_is_last_child_of_pre() {
        let html = highlighter()
            .highlight_block(None, &CodeMeta::default(), "plain\n")
            .expect("highlight");

        assert!(html.ends_with("</button></pre>"));
        assert!(html.contains("data-language=\"text\""));
    }

    #[test]
    fn code_text_is_escaped() {
        let html = highlighter()
            .highlight_block(Some("text"), &CodeMeta::default(), "<b>&</b>\n")
            .expect("highlight");

        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn highlighted_tokens_are_escaped() {
        let html = highlighter()
            .highlight_block(Some("ts"), &CodeMeta::default(), "if (a < b && c > d) {}\n")
            .expect("highlight");

        assert!(html.contains("&lt;"), "{html}");
        assert!(html.contains("&amp;&amp;"), "{html}");
        assert!(!html.contains(" < "), "{html}");
    }

    #[test]
    fn filename_is_attribute_escaped() {
        let meta = CodeMeta {
            filename: Some("a\"b.ts".into()),
            ..CodeMeta::default()
        };
        let html = highlighter()
            .highlight_block(Some("ts"), &meta, "x\n")
            .expect("highlight");

        assert!(html.contains("data-filename=\"a&quot;b.ts\""));
    }
}
