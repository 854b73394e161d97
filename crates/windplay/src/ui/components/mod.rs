//! Collection of reusable TUI components.

pub mod command_palette;
pub mod diagnostics;
pub mod editor;
pub mod output_tabs;
