//! Validation marker list shown under the editor.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use crate::domain::model::{Severity, ValidationMarker, ValidationMarkerSet};

/// Displays the markers of the latest validation pass.
#[derive(Debug, Default)]
pub struct Diagnostics;

impl Diagnostics {
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, markers: &ValidationMarkerSet) {
        let title = match markers.len() {
            0 => "Problems".to_string(),
            count => format!("Problems ({count})"),
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if markers.is_empty() {
            let placeholder = Paragraph::new("No problems")
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(placeholder, inner);
            return;
        }

        let items: Vec<ListItem> = markers.iter().map(marker_item).collect();
        frame.render_widget(List::new(items), inner);
    }
}

fn marker_item(marker: &ValidationMarker) -> ListItem<'_> {
    let color = match marker.severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info | Severity::Hint => Color::Blue,
    };
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("{:<7}", marker.severity.label()),
            Style::default().fg(color),
        ),
        Span::styled(
            format!("{}:{} ", marker.position.line, marker.position.column),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(marker.message.replace('\n', " ")),
    ]))
}
