//! Wire types for the Globus Flows REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flows::{RunState, RunStatus};
use crate::transfer::FlowInput;

/// Body of `POST /flows/{flow_id}/run`.
#[derive(Debug, Serialize)]
pub(super) struct RunFlowBody<'a> {
    pub(super) body: FlowInput<'a>,
    pub(super) label: &'a str,
    pub(super) tags: Vec<String>,
}

/// Subset of the run document returned when a run is started.
#[derive(Debug, Deserialize)]
pub(super) struct RunCreated {
    pub(super) run_id: String,
}

/// Subset of the run document returned by `GET /runs/{run_id}`.
#[derive(Debug, Deserialize)]
pub(super) struct RunDocument {
    pub(super) status: String,
    #[serde(default)]
    pub(super) details: Option<Value>,
}

impl RunDocument {
    pub(super) fn into_state(self) -> RunState {
        RunState {
            status: RunStatus::from_service(&self.status),
            detail: self.details.as_ref().and_then(describe_details),
        }
    }
}

/// Prefers the human readable `description`, falling back to the compact
/// JSON of the details document.
fn describe_details(details: &Value) -> Option<String> {
    if let Some(description) = details.get("description").and_then(Value::as_str) {
        return Some(description.to_owned());
    }
    match details {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
