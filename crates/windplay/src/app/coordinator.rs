//! Generation request coordination.
//!
//! The coordinator folds the three independently changing inputs (windfile text, validation
//! markers, selected target) into one composite key. A request is issued only when that key
//! changes while the input is valid. Every request carries a [`RequestId`] and the snapshot it was
//! issued for, so responses that arrive out of order or for superseded input are discarded instead
//! of overwriting a newer result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::app::validation;
use crate::domain::model::{GenerationTarget, ValidationMarkerSet};

/// Monotonically increasing identifier assigned to each outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Input snapshot a request was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
    pub source: Arc<str>,
    pub target: GenerationTarget,
}

impl RequestKey {
    fn matches(&self, source: &str, target: GenerationTarget) -> bool {
        self.target == target && &*self.source == source
    }
}

/// A request the host must send to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub key: RequestKey,
}

impl GenerationRequest {
    pub fn target(&self) -> GenerationTarget {
        self.key.target
    }

    /// Raw windfile text, sent verbatim as the request body.
    pub fn body(&self) -> &str {
        &self.key.source
    }

    /// Service path relative to the configured endpoint base.
    pub fn path(&self) -> String {
        format!("/generate/{}/yaml", self.key.target.as_str())
    }
}

/// What the generation service produced for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The response carried a `result` field.
    Generated(String),
    /// The response body was empty, not JSON, or lacked `result`.
    Empty,
    /// The request never produced a response.
    Failed(String),
}

/// Response tagged with the id of the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub id: RequestId,
    pub outcome: GenerationOutcome,
}

impl GenerationResponse {
    pub fn new(id: RequestId, outcome: GenerationOutcome) -> Self {
        Self { id, outcome }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Nothing outstanding; the last result (if any) is current.
    Idle,
    /// The input has validation markers; no requests are sent.
    Blocked,
    /// At least one request is awaiting its response.
    Requesting,
}

impl CoordinatorState {
    pub fn label(&self) -> &'static str {
        match self {
            CoordinatorState::Idle => "idle",
            CoordinatorState::Blocked => "blocked",
            CoordinatorState::Requesting => "requesting",
        }
    }
}

/// How a response was handled by [`GenerationCoordinator::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The response replaced the current result.
    Applied,
    /// The response belonged to superseded input and was dropped.
    Stale,
    /// The request failed; the previous result is retained.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ObservedInput {
    key: RequestKey,
    valid: bool,
}

/// Sole writer of the shared generation result.
#[derive(Debug, Default)]
pub struct GenerationCoordinator {
    observed: Option<ObservedInput>,
    next_id: u64,
    in_flight: BTreeMap<RequestId, RequestKey>,
    last_applied: Option<RequestId>,
    result: Option<String>,
}

impl GenerationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate after any input change. Returns the request to send, if any.
    ///
    /// Nothing is issued while `markers` is non-empty or when the composite key equals the one
    /// observed last.
    pub fn observe(
        &mut self,
        source: &str,
        target: GenerationTarget,
        markers: &ValidationMarkerSet,
    ) -> Option<GenerationRequest> {
        let valid = validation::is_valid(markers);
        let unchanged = self
            .observed
            .as_ref()
            .is_some_and(|observed| observed.valid == valid && observed.key.matches(source, target));
        if unchanged {
            return None;
        }

        let key = RequestKey {
            source: Arc::from(source),
            target,
        };
        self.observed = Some(ObservedInput {
            key: key.clone(),
            valid,
        });

        if !valid {
            tracing::debug!(
                markers = markers.len(),
                target = %target,
                "generation blocked by validation markers"
            );
            return None;
        }

        Some(self.issue(key))
    }

    /// Issue a fresh request for the current input, if it is valid.
    pub fn regenerate(&mut self) -> Option<GenerationRequest> {
        let observed = self.observed.as_ref()?;
        if !observed.valid {
            return None;
        }
        let key = observed.key.clone();
        Some(self.issue(key))
    }

    fn issue(&mut self, key: RequestKey) -> GenerationRequest {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.in_flight.insert(id, key.clone());
        tracing::debug!(request = %id, target = %key.target, "issuing generation request");
        GenerationRequest { id, key }
    }

    /// Apply a response, unless it answers superseded input.
    pub fn apply(&mut self, response: GenerationResponse) -> ApplyOutcome {
        let GenerationResponse { id, outcome } = response;
        let Some(key) = self.in_flight.remove(&id) else {
            tracing::debug!(request = %id, "ignoring response for unknown request");
            return ApplyOutcome::Stale;
        };

        let superseded = self.last_applied.is_some_and(|last| last > id);
        let current = self
            .observed
            .as_ref()
            .is_some_and(|observed| observed.key == key);
        if superseded || !current {
            tracing::debug!(
                request = %id,
                superseded,
                failed = matches!(outcome, GenerationOutcome::Failed(_)),
                "discarding stale generation response"
            );
            return ApplyOutcome::Stale;
        }

        self.result = Some(match outcome {
            GenerationOutcome::Generated(text) => text,
            GenerationOutcome::Empty => String::new(),
            GenerationOutcome::Failed(reason) => {
                tracing::warn!(
                    request = %id,
                    target = %key.target,
                    error = %reason,
                    "generation request failed"
                );
                return ApplyOutcome::Failed;
            }
        });
        self.last_applied = Some(id);
        ApplyOutcome::Applied
    }

    /// Latest generation result. `Some("")` means the service answered without a result.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn state(&self) -> CoordinatorState {
        match &self.observed {
            Some(observed) if !observed.valid => CoordinatorState::Blocked,
            _ if !self.in_flight.is_empty() => CoordinatorState::Requesting,
            _ => CoordinatorState::Idle,
        }
    }

    /// Number of requests still awaiting a response.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }
}
