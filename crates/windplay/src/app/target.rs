//! Tracks which output target is currently selected.

use crate::domain::model::GenerationTarget;

#[derive(Debug, Default, Clone, Copy)]
pub struct TargetSelector {
    current: GenerationTarget,
}

impl TargetSelector {
    pub fn new(initial: GenerationTarget) -> Self {
        Self { current: initial }
    }

    pub fn select(&mut self, target: GenerationTarget) {
        self.current = target;
    }

    pub fn current(&self) -> GenerationTarget {
        self.current
    }

    /// Select the target shown by the tab with the given name. Unknown tab names leave the
    /// selection untouched and return `None`.
    pub fn select_tab(&mut self, name: &str) -> Option<GenerationTarget> {
        let target = GenerationTarget::from_tab_name(name)?;
        self.current = target;
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_cli() {
        assert_eq!(TargetSelector::default().current(), GenerationTarget::Cli);
    }

    #[test]
    fn selecting_tabs_updates_target() {
        let mut selector = TargetSelector::default();
        assert_eq!(selector.select_tab("Jenkinsfile"), Some(GenerationTarget::Jenkins));
        assert_eq!(selector.current(), GenerationTarget::Jenkins);

        assert_eq!(selector.select_tab("README.md"), None);
        assert_eq!(selector.current(), GenerationTarget::Jenkins);

        selector.select(GenerationTarget::Bamboo);
        assert_eq!(selector.current(), GenerationTarget::Bamboo);
    }
}
