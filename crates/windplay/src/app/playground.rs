//! Playground session state wiring the editor and output hosts to the coordinator.

use crate::app::coordinator::{
    ApplyOutcome, CoordinatorState, GenerationCoordinator, GenerationRequest, GenerationResponse,
};
use crate::app::distributor::{self, OutputTabDescriptor};
use crate::app::target::TargetSelector;
use crate::app::validation::ValidationGate;
use crate::domain::model::{GenerationTarget, ValidationMarkerSet};

/// Sample windfile shown when the playground starts without a document.
pub const DEFAULT_WINDFILE: &str = include_str!("../../assets/default-windfile.yaml");

/// Every host event funnels through here and may yield a request for the dispatcher.
#[derive(Debug)]
pub struct Playground {
    source: String,
    gate: ValidationGate,
    selector: TargetSelector,
    coordinator: GenerationCoordinator,
}

impl Playground {
    pub fn new(source: impl Into<String>, target: GenerationTarget) -> Self {
        Self {
            source: source.into(),
            gate: ValidationGate::new(),
            selector: TargetSelector::new(target),
            coordinator: GenerationCoordinator::new(),
        }
    }

    /// Evaluate the current inputs without changing them.
    pub fn refresh(&mut self) -> Option<GenerationRequest> {
        self.coordinator
            .observe(&self.source, self.selector.current(), self.gate.markers())
    }

    /// The editor content changed.
    pub fn edit(&mut self, text: impl Into<String>) -> Option<GenerationRequest> {
        self.source = text.into();
        self.refresh()
    }

    /// A validation pass finished.
    pub fn validate(&mut self, markers: ValidationMarkerSet) -> Option<GenerationRequest> {
        self.gate.update(markers);
        self.refresh()
    }

    /// Content change whose validation ran synchronously; evaluated once.
    pub fn edit_validated(
        &mut self,
        text: impl Into<String>,
        markers: ValidationMarkerSet,
    ) -> Option<GenerationRequest> {
        self.source = text.into();
        self.gate.update(markers);
        self.refresh()
    }

    /// The display host switched to the tab at `index`. Indices outside the tab list are ignored.
    pub fn select_tab(&mut self, index: usize) -> Option<GenerationRequest> {
        let name = GenerationTarget::ALL.get(index)?.tab_name();
        self.selector.select_tab(name)?;
        self.refresh()
    }

    pub fn select_target(&mut self, target: GenerationTarget) -> Option<GenerationRequest> {
        self.selector.select(target);
        self.refresh()
    }

    pub fn regenerate(&mut self) -> Option<GenerationRequest> {
        self.coordinator.regenerate()
    }

    pub fn apply(&mut self, response: GenerationResponse) -> ApplyOutcome {
        self.coordinator.apply(response)
    }

    pub fn tabs(&self) -> Vec<OutputTabDescriptor> {
        distributor::distribute(self.coordinator.result(), self.selector.current())
    }

    pub fn selected_tab(&self) -> OutputTabDescriptor {
        distributor::describe(self.selector.current(), self.coordinator.result(), true)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn markers(&self) -> &ValidationMarkerSet {
        self.gate.markers()
    }

    pub fn target(&self) -> GenerationTarget {
        self.selector.current()
    }

    pub fn result(&self) -> Option<&str> {
        self.coordinator.result()
    }

    pub fn state(&self) -> CoordinatorState {
        self.coordinator.state()
    }
}
