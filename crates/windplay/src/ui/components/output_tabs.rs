//! Output pane: one tab per generation target with the highlighted artifact below.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};

use crate::app::distributor::OutputTabDescriptor;
use crate::infra::highlight::{HighlightedText, Highlighter, StyledSpan};

/// Highlighted body of the selected tab plus its scroll offset.
#[derive(Debug, Default)]
pub struct OutputView {
    cached: Option<CachedHighlight>,
    scroll: u16,
}

#[derive(Debug)]
struct CachedHighlight {
    language: &'static str,
    body: String,
    theme: String,
    text: HighlightedText,
}

impl OutputView {
    /// Re-highlight when the selected tab's body, language, or theme changed.
    pub fn refresh(&mut self, highlighter: &Highlighter, tab: &OutputTabDescriptor, theme: &str) {
        let fresh = self.cached.as_ref().is_some_and(|cached| {
            cached.language == tab.language && cached.body == tab.body && cached.theme == theme
        });
        if fresh {
            return;
        }

        let text = if tab.placeholder {
            HighlightedText::plain(&tab.body, theme)
        } else {
            highlighter.highlight(tab.language, &tab.body, theme)
        };
        self.cached = Some(CachedHighlight {
            language: tab.language,
            body: tab.body.clone(),
            theme: theme.to_string(),
            text,
        });
        self.scroll = 0;
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let max = self
            .cached
            .as_ref()
            .map(|cached| cached.text.lines.len().saturating_sub(1))
            .unwrap_or(0);
        let next = (self.scroll as i32 + delta).clamp(0, max.min(u16::MAX as usize) as i32);
        self.scroll = next as u16;
    }

    fn lines(&self) -> &[Vec<StyledSpan>] {
        self.cached
            .as_ref()
            .map(|cached| cached.text.lines.as_slice())
            .unwrap_or(&[])
    }
}

/// Renders the tab bar and the selected tab's body.
#[derive(Debug, Default)]
pub struct OutputTabs;

impl OutputTabs {
    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        tabs: &[OutputTabDescriptor],
        view: &OutputView,
        has_focus: bool,
    ) {
        let border_color = if has_focus {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let block = Block::default()
            .title("Output")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);

        let titles: Vec<Line> = tabs
            .iter()
            .enumerate()
            .map(|(idx, tab)| {
                Line::from(format!("F{} {} {}", idx + 1, tab.icon.glyph(), tab.name))
            })
            .collect();
        let selected = tabs.iter().position(|tab| tab.selected).unwrap_or(0);
        let bar = Tabs::new(titles)
            .select(selected)
            .block(Block::default().borders(Borders::BOTTOM))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(bar, layout[0]);

        let placeholder = tabs.get(selected).is_some_and(|tab| tab.placeholder);
        let lines: Vec<Line> = view
            .lines()
            .iter()
            .map(|line| {
                if placeholder {
                    Line::from(line.iter().map(placeholder_span).collect::<Vec<_>>())
                } else {
                    Line::from(line.iter().map(styled_span_to_span).collect::<Vec<_>>())
                }
            })
            .collect();
        let body = Paragraph::new(lines).scroll((view.scroll(), 0));
        frame.render_widget(body, layout[1]);
    }
}

fn placeholder_span(span: &StyledSpan) -> Span<'_> {
    Span::styled(
        span.content.as_str(),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )
}

fn styled_span_to_span(span: &StyledSpan) -> Span<'_> {
    let mut style = Style::default();
    if let Some(color) = span.style.foreground {
        style = style.fg(Color::Rgb(color.r, color.g, color.b));
    }
    if span.style.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if span.style.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if span.style.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(span.content.as_str(), style)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::app::distributor::{describe, distribute};
    use crate::domain::model::GenerationTarget;

    const THEME: &str = "base16-ocean.dark";

    #[test]
    fn refresh_reuses_cached_highlight_and_keeps_scroll() {
        let highlighter = Highlighter::new();
        let mut view = OutputView::default();
        let tab = describe(GenerationTarget::Cli, Some("a\nb\nc\n"), true);

        view.refresh(&highlighter, &tab, THEME);
        view.scroll_by(2);
        assert_eq!(view.scroll(), 2);

        view.refresh(&highlighter, &tab, THEME);
        assert_eq!(view.scroll(), 2);

        let changed = describe(GenerationTarget::Cli, Some("x\n"), true);
        view.refresh(&highlighter, &changed, THEME);
        assert_eq!(view.scroll(), 0);
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let highlighter = Highlighter::new();
        let mut view = OutputView::default();
        view.refresh(&highlighter, &describe(GenerationTarget::Cli, Some("one\ntwo"), true), THEME);
        view.scroll_by(-5);
        assert_eq!(view.scroll(), 0);
        view.scroll_by(50);
        assert_eq!(view.scroll(), 1);
    }

    #[test]
    fn placeholder_is_not_highlighted() {
        let highlighter = Highlighter::new();
        let mut view = OutputView::default();
        let tabs = distribute(None, GenerationTarget::Jenkins);
        let selected = tabs.iter().find(|tab| tab.selected).unwrap();
        view.refresh(&highlighter, selected, THEME);
        assert_eq!(view.lines().len(), 1);
        assert_eq!(
            view.lines()[0][0].content,
            "enter a valid windfile to generate Jenkinsfile"
        );
    }
}
