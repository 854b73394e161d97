//! Derives the output tab descriptors from the shared generation result.

use crate::domain::model::GenerationTarget;

/// Glyph shown next to a tab name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabIcon {
    Bash,
    Bamboo,
    Jenkins,
}

impl TabIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            TabIcon::Bash => "$_",
            TabIcon::Bamboo => "🎍",
            TabIcon::Jenkins => "🤵",
        }
    }
}

/// Read-only view of one output tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTabDescriptor {
    pub target: GenerationTarget,
    pub name: &'static str,
    /// Syntax highlighting language identifier.
    pub language: &'static str,
    pub icon: TabIcon,
    pub body: String,
    /// Whether `body` is the placeholder rather than generated output.
    pub placeholder: bool,
    pub selected: bool,
}

/// Fixed per-target presentation: language tag, icon, and placeholder text.
pub fn presentation(target: GenerationTarget) -> (&'static str, TabIcon, &'static str) {
    match target {
        GenerationTarget::Cli => (
            "bash",
            TabIcon::Bash,
            "enter a valid windfile to generate bash script",
        ),
        GenerationTarget::Bamboo => (
            "yaml",
            TabIcon::Bamboo,
            "enter a valid windfile to generate Bamboo Build Plan",
        ),
        GenerationTarget::Jenkins => (
            "groovy",
            TabIcon::Jenkins,
            "enter a valid windfile to generate Jenkinsfile",
        ),
    }
}

pub fn placeholder(target: GenerationTarget) -> &'static str {
    presentation(target).2
}

/// Descriptor for a single tab.
pub fn describe(
    target: GenerationTarget,
    result: Option<&str>,
    selected: bool,
) -> OutputTabDescriptor {
    let (language, icon, fallback) = presentation(target);
    let generated = result.filter(|text| !text.is_empty());
    OutputTabDescriptor {
        target,
        name: target.tab_name(),
        language,
        icon,
        body: generated.unwrap_or(fallback).to_string(),
        placeholder: generated.is_none(),
        selected,
    }
}

/// Build all three descriptors from the single shared result slot.
///
/// Every tab shows the same body: the service answers per request, and the most recent answer is
/// displayed whichever target produced it.
pub fn distribute(result: Option<&str>, selected: GenerationTarget) -> Vec<OutputTabDescriptor> {
    GenerationTarget::ALL
        .into_iter()
        .map(|target| describe(target, result, target == selected))
        .collect()
}
