use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{AnalysisRequest, AnalysisResult, AnalysisService, ResultSchema};
use crate::error::WorkflowError;

/// Multipart field carrying the picture.
pub const IMAGE_FIELD: &str = "image";
/// Correlates a response with the upload that caused it.
pub const UPLOAD_ID_HEADER: &str = "X-Upload-Id";

/// Longest plain-text error body shown to the user.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Posts pictures to the configured analysis endpoint.
pub struct HttpAnalysisClient {
    endpoint: Url,
    schema: ResultSchema,
    client: Client,
}

impl HttpAnalysisClient {
    /// Build a client for `endpoint`. The endpoint must be an absolute
    /// http(s) URL; an unset placeholder is rejected here rather than at
    /// upload time.
    pub fn new(
        endpoint: &str,
        schema: ResultSchema,
        timeout: Option<Duration>,
    ) -> Result<Self, String> {
        let endpoint = parse_endpoint(endpoint)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| e.to_string())?;

        Ok(Self {
            endpoint,
            schema,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build_form(request: &AnalysisRequest) -> Result<Form, reqwest::Error> {
        let part = Part::bytes(request.image.data().to_vec())
            .file_name("upload.jpg")
            .mime_str(request.content_type)?;
        Ok(Form::new().part(IMAGE_FIELD, part))
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err("Analysis endpoint is not configured".into());
    }
    let url = Url::parse(trimmed).map_err(|e| format!("Invalid analysis endpoint '{}': {}", trimmed, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!(
            "Analysis endpoint must use http or https, not '{}'",
            other
        )),
    }
}

/// Map a completed HTTP exchange to the workflow outcome.
pub fn classify_response(
    status: StatusCode,
    body: &str,
    schema: &ResultSchema,
) -> Result<AnalysisResult, WorkflowError> {
    if status.is_success() {
        return schema.parse(body).map_err(WorkflowError::malformed_response);
    }
    Err(WorkflowError::server_error(
        status.as_u16(),
        error_message(body),
    ))
}

/// Detail for a failed request: the JSON `message` field, else a short
/// plain-text body, else empty (the error type supplies a generic message).
fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_string(),
        Err(_) if trimmed.starts_with('<') => String::new(),
        Err(_) => trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

/// Transport failures (refused, DNS, timeout, dropped body) all mean the
/// service could not be reached.
fn transport_error(e: &reqwest::Error) -> WorkflowError {
    let detail = if e.is_timeout() {
        "The request timed out".to_string()
    } else if e.is_connect() {
        format!("Could not connect to the analysis service: {}", e)
    } else {
        e.to_string()
    };
    WorkflowError::network_unavailable(detail)
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResult, WorkflowError> {
        let form = Self::build_form(request).map_err(|e| transport_error(&e))?;

        log::info!(
            "Uploading #{} ({} bytes) to {}",
            request.upload_id,
            request.image.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Accept", "application/json")
            .header(UPLOAD_ID_HEADER, request.upload_id.to_string())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                log::warn!("Upload #{} failed: {}", request.upload_id, e);
                transport_error(&e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(&e))?;
        log::info!("Upload #{} answered HTTP {}", request.upload_id, status);

        classify_response(status, &body, &self.schema)
    }

    fn name(&self) -> &str {
        "http-analysis"
    }
}
