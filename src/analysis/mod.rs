use async_trait::async_trait;

use crate::error::WorkflowError;

pub mod client;
pub mod types;
pub use client::HttpAnalysisClient;
pub use types::*;

/// Remote analysis service.
/// One call per upload; the client never retries on its own.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload the request's picture and return the parsed result, or the
    /// workflow-level error describing why it failed.
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResult, WorkflowError>;

    /// Service name for logging/display.
    fn name(&self) -> &str;
}
