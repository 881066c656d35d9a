// workflow.rs — The capture-and-analyze state machine.
//
// One `Workflow` per visit to the capture screen. It owns the current
// picture, upload, result or error, and is the only thing that changes them.
// Transitions happen under one lock, in event order; awaits (camera, network,
// permission prompts) run with the lock released. After `navigate_back` the
// instance is abandoned and late results are dropped.

use serde_json::{json, Map};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::analysis::{AnalysisRequest, AnalysisResult, AnalysisService};
use crate::capture::CaptureController;
use crate::error::{IntentError, WorkflowError};
use crate::navigation::Navigator;
use crate::permission::{Access, PermissionGate, CAPTURE_CAPABILITIES};
use crate::presentation::{render, Intent, View};

/// Process-wide, so ids never repeat across workflow instances.
static NEXT_UPLOAD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    AwaitingPermission,
    Ready,
    Capturing,
    Uploading(AnalysisRequest),
    Succeeded(AnalysisResult),
    Failed(WorkflowError),
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingPermission => "AwaitingPermission",
            Self::Ready => "Ready",
            Self::Capturing => "Capturing",
            Self::Uploading(_) => "Uploading",
            Self::Succeeded(_) => "Succeeded",
            Self::Failed(_) => "Failed",
        }
    }

    /// Id of the outstanding upload, if any.
    pub fn upload_id(&self) -> Option<u64> {
        match self {
            Self::Uploading(request) => Some(request.upload_id),
            _ => None,
        }
    }

    /// End of a capture cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

/// Notified after every transition, while the transition is still exclusive,
/// so observers see states in the order they happened. Must not block.
pub trait StateObserver: Send + Sync {
    fn on_transition(&self, state: &WorkflowState);
}

/// Where the router goes when a cycle finishes or the user backs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub result_screen: String,
    pub home_screen: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            result_screen: "description".into(),
            home_screen: "home".into(),
        }
    }
}

pub struct Workflow {
    state: Mutex<WorkflowState>,
    abandoned: AtomicBool,
    gate: Arc<PermissionGate>,
    camera: CaptureController,
    analyzer: Arc<dyn AnalysisService>,
    navigator: Arc<dyn Navigator>,
    observer: Option<Arc<dyn StateObserver>>,
    destinations: Destinations,
}

impl Workflow {
    pub fn new(
        gate: Arc<PermissionGate>,
        camera: CaptureController,
        analyzer: Arc<dyn AnalysisService>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            state: Mutex::new(WorkflowState::AwaitingPermission),
            abandoned: AtomicBool::new(false),
            gate,
            camera,
            analyzer,
            navigator,
            observer: None,
            destinations: Destinations::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_destinations(mut self, destinations: Destinations) -> Self {
        self.destinations = destinations;
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> WorkflowState {
        self.state.lock().unwrap().clone()
    }

    /// The current state as the screen should show it.
    pub fn view(&self) -> View {
        render(&self.state.lock().unwrap())
    }

    pub fn camera(&self) -> &CaptureController {
        &self.camera
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Check permissions and bring the camera up:
    /// `AwaitingPermission → Ready | Failed`.
    pub async fn start(&self) -> Result<(), IntentError> {
        self.ensure_active()?;
        if *self.state.lock().unwrap() != WorkflowState::AwaitingPermission {
            return Err(IntentError::Rejected("Workflow already started".into()));
        }
        self.prepare().await;
        Ok(())
    }

    /// Leave a finished cycle (result or error) and get ready for a new
    /// capture. Permissions are checked again, so an unfixed denial lands
    /// back in `Failed(PermissionDenied)`.
    pub async fn retry(&self) -> Result<(), IntentError> {
        self.ensure_active()?;
        {
            let mut state = self.state.lock().unwrap();
            if !state.is_terminal() {
                return Err(IntentError::Rejected(format!(
                    "Nothing to retry while {}",
                    state.name()
                )));
            }
            self.transition(&mut state, WorkflowState::AwaitingPermission);
        }
        self.prepare().await;
        Ok(())
    }

    /// Take a picture and upload it. Only valid while `Ready`; a second
    /// capture while one is in flight is rejected.
    ///
    /// Failures during the cycle are stored as `Failed(..)`, not returned.
    pub async fn request_capture(&self) -> Result<(), IntentError> {
        self.ensure_active()?;
        {
            let mut state = self.state.lock().unwrap();
            let rejection = match *state {
                WorkflowState::Ready => None,
                WorkflowState::Capturing | WorkflowState::Uploading(_) => {
                    Some("A capture is already in progress")
                }
                WorkflowState::AwaitingPermission => Some("Camera is not ready yet"),
                WorkflowState::Succeeded(_) | WorkflowState::Failed(_) => {
                    Some("Start a new capture before taking another picture")
                }
            };
            if let Some(reason) = rejection {
                log::warn!("Capture rejected while {}: {}", state.name(), reason);
                return Err(IntentError::Rejected(reason.into()));
            }
            self.transition(&mut state, WorkflowState::Capturing);
        }

        let captured = self.camera.capture().await;

        let request = {
            let mut state = self.state.lock().unwrap();
            if self.is_abandoned() || *state != WorkflowState::Capturing {
                log::debug!("Discarding capture for abandoned workflow");
                return Ok(());
            }
            match captured {
                Ok(image) => {
                    let upload_id = NEXT_UPLOAD_ID.fetch_add(1, Ordering::SeqCst);
                    let request = AnalysisRequest::new(upload_id, image);
                    self.transition(&mut state, WorkflowState::Uploading(request.clone()));
                    request
                }
                Err(e) => {
                    self.transition(&mut state, WorkflowState::Failed(e));
                    return Ok(());
                }
            }
        };

        let outcome = self.analyzer.submit(&request).await;
        self.complete_upload(request.upload_id, outcome);
        Ok(())
    }

    /// Leave the screen. Any upload still running is abandoned: its eventual
    /// outcome is ignored and the state stays as it was.
    pub fn navigate_back(&self) {
        if self.abandon() {
            self.navigator
                .navigate_to(&self.destinations.home_screen, Map::new());
        }
    }

    /// Tear the instance down without navigating. Returns `false` if it was
    /// already abandoned.
    pub fn abandon(&self) -> bool {
        if self.abandoned.swap(true, Ordering::SeqCst) {
            return false;
        }
        log::info!(
            "Workflow abandoned while {}",
            self.state.lock().unwrap().name()
        );
        true
    }

    /// Route a user intent from the screen.
    pub async fn handle(&self, intent: Intent) -> Result<(), IntentError> {
        match intent {
            Intent::RequestCapture => self.request_capture().await,
            Intent::Retry => self.retry().await,
            Intent::NavigateBack => {
                self.navigate_back();
                Ok(())
            }
        }
    }

    /// Apply the outcome of upload `upload_id`. Returns `false` when the
    /// outcome was stale (workflow abandoned or moved on) and dropped.
    fn complete_upload(
        &self,
        upload_id: u64,
        outcome: Result<AnalysisResult, WorkflowError>,
    ) -> bool {
        let params = {
            let mut state = self.state.lock().unwrap();
            if self.is_abandoned() {
                log::info!("Dropping response for upload #{}: workflow abandoned", upload_id);
                return false;
            }
            if state.upload_id() != Some(upload_id) {
                log::info!(
                    "Dropping stale response for upload #{} (state is {})",
                    upload_id,
                    state.name()
                );
                return false;
            }

            match outcome {
                Ok(result) => {
                    let mut params = Map::new();
                    params.insert("uploadId".into(), json!(upload_id));
                    if let Some(label) = result.label() {
                        params.insert("label".into(), json!(label));
                    }
                    self.transition(&mut state, WorkflowState::Succeeded(result));
                    Some(params)
                }
                Err(e) => {
                    log::warn!("Upload #{} failed: {}", upload_id, e);
                    self.transition(&mut state, WorkflowState::Failed(e));
                    None
                }
            }
        };

        if let Some(params) = params {
            self.navigator
                .navigate_to(&self.destinations.result_screen, params);
        }
        true
    }

    /// Permission check plus camera start, then `AwaitingPermission → Ready`
    /// or `→ Failed`. Dropped if the state moved on meanwhile.
    async fn prepare(&self) {
        let next = match self.gate.check_and_request(&CAPTURE_CAPABILITIES).await {
            Access::Denied(capability) => WorkflowState::Failed(WorkflowError::permission_denied(
                format!("{:?} access is required to take pictures", capability),
            )),
            Access::Granted => match self.camera.initialize().await {
                Ok(()) => WorkflowState::Ready,
                Err(e) => WorkflowState::Failed(e),
            },
        };

        let mut state = self.state.lock().unwrap();
        if self.is_abandoned() || *state != WorkflowState::AwaitingPermission {
            log::debug!("Discarding permission result, state is {}", state.name());
            return;
        }
        self.transition(&mut state, next);
    }

    fn ensure_active(&self) -> Result<(), IntentError> {
        if self.is_abandoned() {
            Err(IntentError::Abandoned)
        } else {
            Ok(())
        }
    }

    /// Replace the state (dropping the old payload) and notify the observer.
    fn transition(&self, current: &mut WorkflowState, next: WorkflowState) {
        match &next {
            WorkflowState::Failed(e) => {
                log::warn!("Workflow: {} -> Failed({})", current.name(), e)
            }
            other => log::info!("Workflow: {} -> {}", current.name(), other.name()),
        }
        *current = next;
        if let Some(observer) = &self.observer {
            observer.on_transition(current);
        }
    }
}
