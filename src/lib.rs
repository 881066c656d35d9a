//! Aural Eyes: capture a photo, send it to a remote analysis service, and
//! show the structured result.
//!
//! The capture-and-analyze workflow lives in [`workflow`]; the Tauri shell
//! that hosts it is behind the `app` feature.

pub mod analysis;
pub mod bridge;
pub mod capture;
pub mod error;
pub mod navigation;
pub mod permission;
pub mod presentation;
pub mod settings;
pub mod workflow;

#[cfg(feature = "app")]
mod host;

#[cfg(feature = "app")]
pub use host::run;

pub use error::{IntentError, WorkflowError};
pub use workflow::{Workflow, WorkflowState};
