//! Validation gate deciding whether the current windfile may be sent for generation.

use crate::domain::model::{Severity, ValidationMarkerSet};

/// Any outstanding marker blocks generation, whatever its severity.
pub fn is_valid(markers: &ValidationMarkerSet) -> bool {
    markers.is_empty()
}

/// Holds the marker set of the most recent validation pass.
#[derive(Debug, Default, Clone)]
pub struct ValidationGate {
    markers: ValidationMarkerSet,
}

impl ValidationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored markers with the latest validation pass.
    pub fn update(&mut self, markers: ValidationMarkerSet) {
        self.markers = markers;
    }

    pub fn markers(&self) -> &ValidationMarkerSet {
        &self.markers
    }

    pub fn is_open(&self) -> bool {
        is_valid(&self.markers)
    }

    /// Highest severity among the current markers.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.markers.iter().map(|marker| marker.severity).max()
    }
}
