// presentation.rs — What the capture screen shows, derived purely from the
// workflow state, and the intents the screen can send back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::WorkflowState;

/// Payload emitted on `workflow:view` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum View {
    /// Waiting on the permission prompt.
    RequestingPermissions { message: String },
    /// Shutter, flash and flip controls.
    CaptureControls { enabled: bool },
    /// Picture taken or upload running.
    Progress { message: String, upload_id: Option<u64> },
    /// Formatted analysis result.
    Result {
        title: String,
        entries: Vec<ResultEntry>,
        raw: String,
        retry_label: String,
    },
    /// Dismissible error banner with a retry affordance.
    Error {
        kind: String,
        message: String,
        guidance: Option<String>,
        retry_label: String,
    },
}

/// One `name: value` line of the result view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub name: String,
    pub value: String,
}

/// User actions forwarded into the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    RequestCapture,
    Retry,
    NavigateBack,
}

pub fn render(state: &WorkflowState) -> View {
    match state {
        WorkflowState::AwaitingPermission => View::RequestingPermissions {
            message: "Requesting permissions...".into(),
        },
        WorkflowState::Ready => View::CaptureControls { enabled: true },
        WorkflowState::Capturing => View::Progress {
            message: "Taking picture...".into(),
            upload_id: None,
        },
        WorkflowState::Uploading(request) => View::Progress {
            message: "Processing image...".into(),
            upload_id: Some(request.upload_id),
        },
        WorkflowState::Succeeded(result) => View::Result {
            title: result.label().unwrap_or("Analysis result").to_string(),
            entries: result
                .fields()
                .iter()
                .map(|(name, value)| ResultEntry {
                    name: name.clone(),
                    value: format_value(value),
                })
                .collect(),
            raw: serde_json::to_string_pretty(result.fields()).unwrap_or_default(),
            retry_label: "New capture".into(),
        },
        WorkflowState::Failed(error) => View::Error {
            kind: error.kind().to_string(),
            message: error.message().to_string(),
            guidance: error.guidance().map(str::to_string),
            retry_label: "Try again".into(),
        },
    }
}

/// Strings without quotes, probabilities as percentages, the rest as JSON.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && (0.0..=1.0).contains(&f) => format!("{:.0}%", f * 100.0),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
