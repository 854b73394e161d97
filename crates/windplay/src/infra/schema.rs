//! Windfile validation producing editor markers.
//!
//! YAML syntax errors are reported first; syntactically valid documents are then checked against
//! the windfile JSON schema, either fetched from its published location or the embedded copy.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::domain::model::{MarkerPosition, ValidationMarker, ValidationMarkerSet};
use crate::infra::config::SchemaConfig;

static EMBEDDED_SCHEMA: &str = include_str!("../../assets/windfile.schema.json");

/// Where the active schema came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Remote(String),
    Embedded,
}

impl SchemaSource {
    pub fn describe(&self) -> &str {
        match self {
            SchemaSource::Remote(uri) => uri,
            SchemaSource::Embedded => "embedded schema",
        }
    }
}

pub struct SchemaValidator {
    validator: jsonschema::Validator,
    source: SchemaSource,
}

impl SchemaValidator {
    /// Validator backed by the schema bundled with the binary.
    pub fn embedded() -> Result<Self> {
        let schema: Value =
            serde_json::from_str(EMBEDDED_SCHEMA).context("embedded windfile schema is not JSON")?;
        Self::from_schema(&schema, SchemaSource::Embedded)
    }

    pub fn from_schema(schema: &Value, source: SchemaSource) -> Result<Self> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|err| anyhow!("invalid windfile schema from {}: {err}", source.describe()))?;
        Ok(Self { validator, source })
    }

    /// Fetch the configured schema, falling back to the embedded one when fetching is disabled or
    /// fails.
    pub async fn load(config: &SchemaConfig, timeout: Duration) -> Result<Self> {
        if config.fetch() {
            let uri = config.uri();
            match fetch_schema(&uri, timeout).await {
                Ok(validator) => {
                    tracing::info!(uri = %uri, "using published windfile schema");
                    return Ok(validator);
                }
                Err(err) => {
                    tracing::warn!(uri = %uri, error = %format!("{err:#}"), "falling back to embedded windfile schema");
                }
            }
        }
        Self::embedded()
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    /// Validate `text`, returning markers in document order.
    pub fn validate(&self, text: &str) -> ValidationMarkerSet {
        let document: serde_yaml::Value = match serde_yaml::from_str(text) {
            Ok(document) => document,
            Err(err) => return vec![syntax_marker(&err)],
        };

        let instance = match serde_json::to_value(&document) {
            Ok(instance) => instance,
            Err(err) => {
                return vec![ValidationMarker::error(
                    format!("unsupported YAML construct: {err}"),
                    MarkerPosition::default(),
                )];
            }
        };

        let mut markers: ValidationMarkerSet = self
            .validator
            .iter_errors(&instance)
            .map(|error| {
                let pointer = error.instance_path.to_string();
                ValidationMarker::error(error.to_string(), locate(text, &pointer))
            })
            .collect();
        markers.sort_by_key(|marker| marker.position);
        markers
    }
}

async fn fetch_schema(uri: &str, timeout: Duration) -> Result<SchemaValidator> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let schema: Value = client
        .get(uri)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|| format!("failed to download schema from {uri}"))?
        .json()
        .await
        .with_context(|| format!("schema at {uri} is not JSON"))?;

    // Compiling may resolve remote `$ref`s with a blocking client.
    let source = SchemaSource::Remote(uri.to_string());
    tokio::task::spawn_blocking(move || SchemaValidator::from_schema(&schema, source))
        .await
        .context("schema compilation task panicked")?
}

fn syntax_marker(err: &serde_yaml::Error) -> ValidationMarker {
    let position = err
        .location()
        .map(|location| MarkerPosition::new(location.line(), location.column()))
        .unwrap_or_default();
    ValidationMarker::error(err.to_string(), position)
}

/// Find the line declaring the last named key of a JSON pointer.
fn locate(text: &str, pointer: &str) -> MarkerPosition {
    let Some(key) = pointer
        .rsplit('/')
        .find(|segment| !segment.is_empty() && segment.parse::<usize>().is_err())
    else {
        return MarkerPosition::default();
    };
    let key = key.replace("~1", "/").replace("~0", "~");

    text.lines()
        .enumerate()
        .find_map(|(idx, line)| {
            let trimmed = line.trim_start();
            let rest = trimmed.strip_prefix(key.as_str())?;
            rest.starts_with(':')
                .then(|| MarkerPosition::new(idx + 1, line.len() - trimmed.len() + 1))
        })
        .unwrap_or_default()
}
