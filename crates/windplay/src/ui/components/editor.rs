//! Windfile editor pane: a rope-backed text buffer with a marker gutter.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ropey::Rope;
use unicode_width::UnicodeWidthChar;

use crate::domain::model::{Severity, ValidationMarkerSet};

const INDENT: &str = "  ";
const PAGE: usize = 10;

/// Text buffer and cursor of the editor pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    text: Rope,
    row: usize,
    /// Cursor column in characters.
    col: usize,
    /// First visible line.
    scroll: usize,
    /// First visible display cell of each line.
    hscroll: usize,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::from_text("")
    }
}

impl EditorState {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: Rope::from_str(text),
            row: 0,
            col: 0,
            scroll: 0,
            hscroll: 0,
        }
    }

    /// Buffer contents as a single string.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    /// Apply an editing or movement key. Returns `true` when the text changed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return false;
        }

        match key.code {
            KeyCode::Char(ch) => {
                let mut buf = [0u8; 4];
                self.insert_str(ch.encode_utf8(&mut buf));
                true
            }
            KeyCode::Tab => {
                self.insert_str(INDENT);
                true
            }
            KeyCode::Enter => {
                self.newline();
                true
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.move_left();
                false
            }
            KeyCode::Right => {
                self.move_right();
                false
            }
            KeyCode::Up => {
                self.move_vertical(-1);
                false
            }
            KeyCode::Down => {
                self.move_vertical(1);
                false
            }
            KeyCode::PageUp => {
                self.move_vertical(-(PAGE as isize));
                false
            }
            KeyCode::PageDown => {
                self.move_vertical(PAGE as isize);
                false
            }
            KeyCode::Home => {
                self.col = 0;
                false
            }
            KeyCode::End => {
                self.col = self.line_len(self.row);
                false
            }
            _ => false,
        }
    }

    /// Insert text at the cursor. Newlines split the current line.
    pub fn insert_str(&mut self, text: &str) {
        let at = self.cursor_char();
        self.text.insert(at, text);
        self.place_cursor(at + text.chars().count());
    }

    /// Split the line at the cursor, carrying the current indentation over.
    pub fn newline(&mut self) {
        let indent: String = self
            .text
            .line(self.row)
            .chars()
            .take(self.col)
            .take_while(|ch| *ch == ' ')
            .collect();
        self.insert_str(&format!("\n{indent}"));
    }

    pub fn backspace(&mut self) -> bool {
        let end = self.cursor_char();
        let start = if self.col > 0 {
            end - 1
        } else if self.row > 0 {
            self.text.line_to_char(self.row - 1) + self.line_len(self.row - 1)
        } else {
            return false;
        };
        self.text.remove(start..end);
        self.place_cursor(start);
        true
    }

    pub fn delete(&mut self) -> bool {
        let start = self.cursor_char();
        let end = if self.col < self.line_len(self.row) {
            start + 1
        } else if self.row + 1 < self.text.len_lines() {
            self.text.line_to_char(self.row + 1)
        } else {
            return false;
        };
        self.text.remove(start..end);
        true
    }

    fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.text.len_lines() {
            self.row += 1;
            self.col = 0;
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        let last = self.text.len_lines().saturating_sub(1);
        self.row = self.row.saturating_add_signed(delta).min(last);
        self.col = self.col.min(self.line_len(self.row));
    }

    fn cursor_char(&self) -> usize {
        self.text.line_to_char(self.row) + self.col
    }

    fn place_cursor(&mut self, char_idx: usize) {
        self.row = self.text.char_to_line(char_idx);
        self.col = char_idx - self.text.line_to_char(self.row);
    }

    /// Characters on `row`, excluding the line break.
    fn line_len(&self, row: usize) -> usize {
        let line = self.text.line(row);
        let mut len = line.len_chars();
        while len > 0 && is_line_break(line.char(len - 1)) {
            len -= 1;
        }
        len
    }

    fn line_text(&self, row: usize) -> String {
        self.text.line(row).chars().take(self.line_len(row)).collect()
    }

    /// Display cells between the start of the cursor line and the cursor.
    fn cursor_column(&self) -> usize {
        self.text
            .line(self.row)
            .chars()
            .take(self.col)
            .map(|ch| ch.width().unwrap_or(0))
            .sum()
    }

    /// Keep the cursor inside a viewport of `height` rows and `width` cells.
    fn scroll_into_view(&mut self, height: usize, width: usize) {
        self.scroll = self.scroll.min(self.row);
        if height > 0 && self.row >= self.scroll + height {
            self.scroll = self.row + 1 - height;
        }

        let column = self.cursor_column();
        self.hscroll = self.hscroll.min(column);
        if width > 0 && column >= self.hscroll + width {
            self.hscroll = column + 1 - width;
        }
    }
}

fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// Renders the editor buffer with line numbers and validation markers.
#[derive(Debug, Default)]
pub struct Editor;

impl Editor {
    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        state: &mut EditorState,
        markers: &ValidationMarkerSet,
        has_focus: bool,
    ) {
        let border_color = if has_focus {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let block = Block::default()
            .title("windfile")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(GUTTER_WIDTH), Constraint::Min(0)])
            .split(inner);
        let (gutter_area, text_area) = (columns[0], columns[1]);

        state.scroll_into_view(inner.height as usize, text_area.width as usize);
        let visible = state.scroll..(state.scroll + inner.height as usize).min(state.line_count());

        let gutter: Vec<Line> = visible
            .clone()
            .map(|idx| {
                Line::from(vec![
                    Span::styled(
                        format!("{:>4} ", idx + 1),
                        Style::default().fg(Color::DarkGray),
                    ),
                    gutter_span(line_severity(markers, idx + 1)),
                    Span::raw(" "),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(gutter), gutter_area);

        let lines: Vec<Line> = visible.map(|idx| Line::raw(state.line_text(idx))).collect();
        let hscroll = u16::try_from(state.hscroll).unwrap_or(u16::MAX);
        frame.render_widget(Paragraph::new(lines).scroll((0, hscroll)), text_area);

        if !has_focus || inner.height == 0 || text_area.width == 0 {
            return;
        }
        let (Some(dy), Some(dx)) = (
            state.row.checked_sub(state.scroll),
            state.cursor_column().checked_sub(state.hscroll),
        ) else {
            return;
        };
        let (x, y) = (text_area.x as usize + dx, inner.y as usize + dy);
        if x < text_area.right() as usize && y < inner.bottom() as usize {
            frame.set_cursor(x as u16, y as u16);
        }
    }
}

/// Line number, marker, and separator columns.
const GUTTER_WIDTH: u16 = 7;

fn line_severity(markers: &ValidationMarkerSet, line: usize) -> Option<Severity> {
    markers
        .iter()
        .filter(|marker| marker.position.line == line)
        .map(|marker| marker.severity)
        .max()
}

fn gutter_span(severity: Option<Severity>) -> Span<'static> {
    let Some(severity) = severity else {
        return Span::raw(" ");
    };
    let color = match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info | Severity::Hint => Color::Blue,
    };
    Span::styled(
        "●",
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}
