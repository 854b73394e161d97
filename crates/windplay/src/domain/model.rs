//! Domain models for windfile sources, validation markers, and generation targets.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Output format requested from the generation service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum GenerationTarget {
    /// Plain bash script runnable on a local machine.
    #[default]
    Cli,
    /// Jenkins pipeline (Jenkinsfile).
    Jenkins,
    /// Bamboo build plan specification.
    Bamboo,
}

impl GenerationTarget {
    /// Every target in display order of the output tabs.
    pub const ALL: [GenerationTarget; 3] = [
        GenerationTarget::Cli,
        GenerationTarget::Bamboo,
        GenerationTarget::Jenkins,
    ];

    /// Path segment used by the generation service.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationTarget::Cli => "cli",
            GenerationTarget::Jenkins => "jenkins",
            GenerationTarget::Bamboo => "bamboo",
        }
    }

    /// Name of the output tab that displays this target.
    pub fn tab_name(&self) -> &'static str {
        match self {
            GenerationTarget::Cli => "generated.sh",
            GenerationTarget::Bamboo => "Bamboo Build Plan",
            GenerationTarget::Jenkins => "Jenkinsfile",
        }
    }

    /// Map an output tab name back to its target. Unknown names yield `None`.
    pub fn from_tab_name(name: &str) -> Option<Self> {
        match name {
            "generated.sh" => Some(GenerationTarget::Cli),
            "Bamboo Build Plan" => Some(GenerationTarget::Bamboo),
            "Jenkinsfile" => Some(GenerationTarget::Jenkins),
            _ => None,
        }
    }

    /// Position of this target's tab in the output pane.
    pub fn tab_index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|target| target == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for GenerationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationTarget {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cli" | "bash" | "sh" => Ok(GenerationTarget::Cli),
            "jenkins" | "jenkinsfile" => Ok(GenerationTarget::Jenkins),
            "bamboo" => Ok(GenerationTarget::Bamboo),
            other => Err(DomainError::UnknownTarget(other.to_string())),
        }
    }
}

/// Severity reported by the schema validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Hint,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One-based line/column position inside the windfile source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerPosition {
    pub line: usize,
    pub column: usize,
}

impl MarkerPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line: line.max(1),
            column: column.max(1),
        }
    }
}

impl Default for MarkerPosition {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Diagnostic attached to a position of the windfile source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMarker {
    pub severity: Severity,
    pub message: String,
    pub position: MarkerPosition,
}

impl ValidationMarker {
    pub fn new(severity: Severity, message: impl Into<String>, position: MarkerPosition) -> Self {
        Self {
            severity,
            message: message.into(),
            position,
        }
    }

    pub fn error(message: impl Into<String>, position: MarkerPosition) -> Self {
        Self::new(Severity::Error, message, position)
    }
}

/// Ordered markers produced by one validation pass.
pub type ValidationMarkerSet = Vec<ValidationMarker>;
