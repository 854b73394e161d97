//! Command palette component for quick actions.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::domain::model::GenerationTarget;

pub const HELP: &str =
    "Commands: target <cli|bamboo|jenkins>, regenerate, write [path], save, reset, help";

/// Parsed palette input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteCommand {
    Target(GenerationTarget),
    Regenerate,
    /// Write the selected output; `None` uses the tab's default file name.
    Write(Option<PathBuf>),
    Save,
    /// Replace the editor contents with the sample windfile.
    Reset,
    Help,
}

impl PaletteCommand {
    /// Parse a command line such as `target jenkins` or `write out/Jenkinsfile`.
    pub fn parse(input: &str) -> Result<Option<Self>> {
        let input = input.trim();
        let Some(verb) = input.split_whitespace().next() else {
            return Ok(None);
        };
        let rest = input[verb.len()..].trim();

        let command = match verb {
            "target" | "t" => {
                if rest.is_empty() {
                    return Err(anyhow!("target command requires cli, bamboo, or jenkins"));
                }
                PaletteCommand::Target(rest.parse()?)
            }
            "regenerate" | "r" => PaletteCommand::Regenerate,
            "write" | "w" => PaletteCommand::Write((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "save" => PaletteCommand::Save,
            "reset" => PaletteCommand::Reset,
            "help" | "?" => PaletteCommand::Help,
            other => return Err(anyhow!("unknown command '{other}'")),
        };
        Ok(Some(command))
    }
}

/// Interactive state backing the command palette overlay.
#[derive(Debug, Default, Clone)]
pub struct CommandPaletteState {
    visible: bool,
    input: String,
}

impl CommandPaletteState {
    /// Reveal the palette with an empty input buffer.
    pub fn open(&mut self) {
        self.visible = true;
        self.input.clear();
    }

    /// Hide the palette.
    pub fn close(&mut self) {
        self.visible = false;
    }

    /// Whether the palette is currently displayed.
    pub fn is_open(&self) -> bool {
        self.visible
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Consume the current input, leaving the buffer empty.
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn push_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }
}

/// Visual component that renders the command palette overlay.
#[derive(Debug, Default)]
pub struct CommandPalette;

impl CommandPalette {
    /// Draw the palette if it is visible.
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &CommandPaletteState) {
        if !state.is_open() {
            return;
        }

        let width = area.width.saturating_sub(10).min(80);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(4),
            width,
            height: 3.min(area.height),
        };

        frame.render_widget(Clear, popup);
        let prompt = Paragraph::new(format!(":{}", state.input()))
            .style(Style::default().fg(Color::White))
            .block(
                Block::default()
                    .title("Command")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        frame.render_widget(prompt, popup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() -> Result<()> {
        assert_eq!(
            PaletteCommand::parse("target jenkins")?,
            Some(PaletteCommand::Target(GenerationTarget::Jenkins))
        );
        assert_eq!(
            PaletteCommand::parse("  write out/generated.sh ")?,
            Some(PaletteCommand::Write(Some(PathBuf::from("out/generated.sh"))))
        );
        assert_eq!(PaletteCommand::parse("w")?, Some(PaletteCommand::Write(None)));
        assert_eq!(PaletteCommand::parse("regenerate")?, Some(PaletteCommand::Regenerate));
        assert_eq!(PaletteCommand::parse("")?, None);
        Ok(())
    }

    #[test]
    fn rejects_unknown_verbs_and_targets() {
        assert!(PaletteCommand::parse("deploy").is_err());
        assert!(PaletteCommand::parse("target").is_err());
        assert!(PaletteCommand::parse("target gitlab").is_err());
    }

    #[test]
    fn state_collects_and_clears_input() {
        let mut state = CommandPaletteState::default();
        state.open();
        state.push_char('s');
        state.push_char('x');
        state.pop_char();
        assert_eq!(state.input(), "s");
        assert_eq!(state.take_input(), "s");
        assert_eq!(state.input(), "");
        state.close();
        assert!(!state.is_open());
    }
}
