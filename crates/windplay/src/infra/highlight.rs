//! Syntax highlighting for generated artifacts and the windfile editor, built on syntect.

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style as SyntectStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

const DEFAULT_THEME: &str = "base16-ocean.dark";

static DEFAULT_ASSETS: Lazy<(Arc<SyntaxSet>, Arc<ThemeSet>)> = Lazy::new(|| {
    (
        Arc::new(SyntaxSet::load_defaults_newlines()),
        Arc::new(ThemeSet::load_defaults()),
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    pub foreground: Option<RgbColor>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub content: String,
    pub style: SpanStyle,
}

pub type StyledLine = Vec<StyledSpan>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightMode {
    Highlighted,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedText {
    pub lines: Vec<StyledLine>,
    /// Name of the syntax used, when one matched the language tag.
    pub syntax: Option<String>,
    pub theme: String,
    pub mode: HighlightMode,
}

impl HighlightedText {
    pub fn plain(text: &str, theme: impl Into<String>) -> Self {
        Self {
            lines: text
                .lines()
                .map(|line| {
                    vec![StyledSpan {
                        content: line.to_string(),
                        style: SpanStyle::default(),
                    }]
                })
                .collect(),
            syntax: None,
            theme: theme.into(),
            mode: HighlightMode::Plain,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Highlighter {
    syntax_set: Arc<SyntaxSet>,
    theme_set: Arc<ThemeSet>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        let assets = &*DEFAULT_ASSETS;
        Self {
            syntax_set: Arc::clone(&assets.0),
            theme_set: Arc::clone(&assets.1),
        }
    }

    pub fn available_themes(&self) -> Vec<String> {
        let mut themes: Vec<_> = self.theme_set.themes.keys().cloned().collect();
        themes.sort();
        themes
    }

    /// Highlight `text` using the syntax registered for `language` (`bash`, `yaml`, `groovy`, …).
    /// Unknown languages render as plain text.
    pub fn highlight(&self, language: &str, text: &str, theme: &str) -> HighlightedText {
        let Some((resolved_name, resolved)) = self.resolve_theme(theme) else {
            return HighlightedText::plain(text, theme);
        };
        let theme_name = resolved_name.into_owned();

        let Some(syntax) = self.syntax_set.find_syntax_by_token(language) else {
            tracing::debug!(language, "no syntax for language tag");
            return HighlightedText::plain(text, theme_name);
        };

        match self.highlight_with_syntax(text, resolved, syntax) {
            Ok(lines) => HighlightedText {
                lines,
                syntax: Some(syntax.name.clone()),
                theme: theme_name,
                mode: HighlightMode::Highlighted,
            },
            Err(err) => {
                tracing::warn!(error = %err, language, "highlight failed");
                HighlightedText::plain(text, theme_name)
            }
        }
    }

    fn highlight_with_syntax(
        &self,
        text: &str,
        theme: &Theme,
        syntax: &SyntaxReference,
    ) -> Result<Vec<StyledLine>> {
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(text) {
            let segments = highlighter.highlight_line(line, &self.syntax_set)?;
            let spans = segments
                .into_iter()
                .filter_map(|(style, fragment)| {
                    let content = fragment.trim_end_matches(['\n', '\r']);
                    (!content.is_empty()).then(|| StyledSpan {
                        content: content.to_string(),
                        style: convert_style(style),
                    })
                })
                .collect();
            lines.push(spans);
        }
        Ok(lines)
    }

    fn resolve_theme<'a>(&'a self, requested: &'a str) -> Option<(Cow<'a, str>, &'a Theme)> {
        if let Some(theme) = self.theme_set.themes.get(requested) {
            return Some((Cow::Borrowed(requested), theme));
        }

        if let Some((name, theme)) = self
            .theme_set
            .themes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(requested))
        {
            return Some((Cow::Owned(name.clone()), theme));
        }

        let (name, theme) = self
            .theme_set
            .themes
            .get_key_value(DEFAULT_THEME)
            .or_else(|| self.theme_set.themes.iter().next())?;
        tracing::warn!(requested, fallback = %name, "theme not found");
        Some((Cow::Owned(name.clone()), theme))
    }
}

fn convert_style(style: SyntectStyle) -> SpanStyle {
    let color = style.foreground;
    SpanStyle {
        foreground: (color.a != 0).then_some(RgbColor {
            r: color.r,
            g: color.g,
            b: color.b,
        }),
        bold: style.font_style.contains(FontStyle::BOLD),
        italic: style.font_style.contains(FontStyle::ITALIC),
        underline: style.font_style.contains(FontStyle::UNDERLINE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_is_highlighted() {
        let highlighter = Highlighter::new();
        let result = highlighter.highlight("yaml", "api: v0.0.1\nactions: {}\n", DEFAULT_THEME);

        assert_eq!(result.mode, HighlightMode::Highlighted);
        assert_eq!(result.lines.len(), 2);
        assert!(result.lines[0].len() > 1);
        let rebuilt: String = result.lines[0].iter().map(|span| span.content.as_str()).collect();
        assert_eq!(rebuilt, "api: v0.0.1");
    }

    #[test]
    fn bash_tag_resolves_a_shell_syntax() {
        let highlighter = Highlighter::new();
        let result = highlighter.highlight("bash", "#!/bin/bash\necho hi", DEFAULT_THEME);
        assert_eq!(result.mode, HighlightMode::Highlighted);
        assert!(result.syntax.is_some());
    }

    #[test]
    fn unknown_language_is_plain() {
        let highlighter = Highlighter::new();
        let result = highlighter.highlight("windfile-dsl", "one\ntwo", DEFAULT_THEME);
        assert_eq!(result.mode, HighlightMode::Plain);
        assert_eq!(result.lines.len(), 2);
    }

    #[test]
    fn unknown_theme_falls_back() {
        let highlighter = Highlighter::new();
        let result = highlighter.highlight("yaml", "a: 1", "not-a-theme");
        assert_eq!(result.mode, HighlightMode::Highlighted);
        assert_eq!(result.theme, DEFAULT_THEME);
        assert!(
            highlighter
                .available_themes()
                .iter()
                .any(|theme| theme == DEFAULT_THEME)
        );
    }
}
