use serde::Serialize;
use serde_json::{Map, Value};

use crate::capture::CapturedImage;

/// Content type of every uploaded picture.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// One upload: the captured picture plus the id that ties the eventual
/// response back to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub upload_id: u64,
    pub content_type: &'static str,
    pub image: CapturedImage,
}

impl AnalysisRequest {
    pub fn new(upload_id: u64, image: CapturedImage) -> Self {
        Self {
            upload_id,
            content_type: IMAGE_CONTENT_TYPE,
            image,
        }
    }
}

/// Structured answer from the analysis service: the JSON object it returned,
/// kept field for field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysisResult {
    fields: Map<String, Value>,
}

impl AnalysisResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The `label` field, when the service sends one as a string.
    pub fn label(&self) -> Option<&str> {
        self.get("label").and_then(|v| v.as_str())
    }

    /// The `confidence` field, when the service sends one as a number.
    pub fn confidence(&self) -> Option<f64> {
        self.get("confidence").and_then(|v| v.as_f64())
    }
}

/// Minimal shape a success body must have.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSchema {
    pub required_fields: Vec<String>,
}

impl Default for ResultSchema {
    fn default() -> Self {
        Self {
            required_fields: vec!["label".into(), "confidence".into()],
        }
    }
}

impl ResultSchema {
    pub fn new<I, S>(required_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_fields: required_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a 2xx body. It must be a JSON object holding every required
    /// field with a non-null value.
    pub fn parse(&self, body: &str) -> Result<AnalysisResult, String> {
        let value: Value =
            serde_json::from_str(body.trim()).map_err(|e| format!("Response is not valid JSON: {}", e))?;

        let fields = match value {
            Value::Object(map) => map,
            other => {
                return Err(format!(
                    "Expected a JSON object, got {}",
                    json_kind(&other)
                ))
            }
        };

        let missing: Vec<&str> = self
            .required_fields
            .iter()
            .filter(|name| fields.get(name.as_str()).map_or(true, Value::is_null))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(format!("Response is missing field(s): {}", missing.join(", ")));
        }

        Ok(AnalysisResult::new(fields))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
