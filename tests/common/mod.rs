//! Mock collaborators shared by the integration tests.
//! Deterministic: no device, no permission prompts, no real network.

#![allow(dead_code)]

use async_trait::async_trait;
use auraleyes_lib::analysis::{AnalysisRequest, AnalysisResult, AnalysisService, ResultSchema};
use auraleyes_lib::capture::{CameraDriver, CaptureController, CaptureOptions, Orientation, RawCapture};
use auraleyes_lib::navigation::Navigator;
use auraleyes_lib::permission::{Capability, PermissionGate, PermissionProvider, PermissionStatus};
use auraleyes_lib::workflow::{StateObserver, Workflow, WorkflowState};
use auraleyes_lib::WorkflowError;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// Answers every prompt with `answer`; counts prompts.
pub struct MockPermissions {
    statuses: Mutex<std::collections::HashMap<Capability, PermissionStatus>>,
    answer: PermissionStatus,
    pub prompts: AtomicUsize,
}

impl MockPermissions {
    pub fn new(answer: PermissionStatus) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(Default::default()),
            answer,
            prompts: AtomicUsize::new(0),
        })
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionProvider for MockPermissions {
    async fn status(&self, capability: Capability) -> PermissionStatus {
        self.statuses
            .lock()
            .unwrap()
            .get(&capability)
            .copied()
            .unwrap_or(PermissionStatus::Undetermined)
    }

    async fn request(&self, capability: Capability) -> PermissionStatus {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.statuses.lock().unwrap().insert(capability, self.answer);
        self.answer
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([40, 80, 160])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

/// Returns scripted shots; once the script runs out every capture succeeds
/// with a `width`×`height` JPEG.
pub struct MockCamera {
    width: u32,
    height: u32,
    script: Mutex<VecDeque<Result<(), String>>>,
    pub captures: AtomicUsize,
    pub inits: AtomicUsize,
}

impl MockCamera {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Self::scripted(width, height, vec![])
    }

    pub fn scripted(width: u32, height: u32, script: Vec<Result<(), String>>) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            script: Mutex::new(script.into()),
            captures: AtomicUsize::new(0),
            inits: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CameraDriver for MockCamera {
    async fn initialize(&self) -> Result<(), String> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn capture(&self, _options: CaptureOptions) -> Result<RawCapture, String> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        if let Some(Err(reason)) = next {
            return Err(reason);
        }
        Ok(RawCapture {
            data: jpeg(self.width, self.height),
            orientation: Orientation::LandscapeLeft,
        })
    }
}

// ---------------------------------------------------------------------------
// Analysis service
// ---------------------------------------------------------------------------

/// Holds each submission until `release()` is called, then answers with the
/// next scripted outcome (or the default body). Tracks concurrency.
pub struct GatedAnalyzer {
    gate: Semaphore,
    outcomes: Mutex<VecDeque<Result<String, WorkflowError>>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
    pub upload_ids: Mutex<Vec<u64>>,
}

pub const DOOR: &str = r#"{"label":"door","confidence":0.92}"#;

impl GatedAnalyzer {
    /// Answers immediately.
    pub fn open(outcomes: Vec<Result<String, WorkflowError>>) -> Arc<Self> {
        let a = Self::gated(outcomes);
        a.gate.add_permits(Semaphore::MAX_PERMITS / 2);
        a
    }

    /// Waits for `release()` before answering each submission.
    pub fn gated(outcomes: Vec<Result<String, WorkflowError>>) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            outcomes: Mutex::new(outcomes.into()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            upload_ids: Mutex::new(Vec::new()),
        })
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl AnalysisService for GatedAnalyzer {
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResult, WorkflowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.upload_ids.lock().unwrap().push(request.upload_id);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.gate.acquire().await.unwrap().forget();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(DOOR.to_string()));
        match outcome {
            Ok(body) => ResultSchema::default()
                .parse(&body)
                .map_err(WorkflowError::malformed_response),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "gated"
    }
}

// ---------------------------------------------------------------------------
// Router + observer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockRouter {
    pub visits: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MockRouter {
    pub fn screens(&self) -> Vec<String> {
        self.visits.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl Navigator for MockRouter {
    fn navigate_to(&self, screen: &str, params: Map<String, Value>) {
        self.visits.lock().unwrap().push((screen.to_string(), params));
    }
}

/// Keeps every state the workflow passes through.
#[derive(Default)]
pub struct StateLog {
    pub states: Mutex<Vec<WorkflowState>>,
}

impl StateLog {
    pub fn names(&self) -> Vec<&'static str> {
        self.states.lock().unwrap().iter().map(|s| s.name()).collect()
    }
}

impl StateObserver for StateLog {
    fn on_transition(&self, state: &WorkflowState) {
        self.states.lock().unwrap().push(state.clone());
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub struct Harness {
    pub workflow: Arc<Workflow>,
    pub router: Arc<MockRouter>,
    pub log: Arc<StateLog>,
}

pub fn build(
    gate: Arc<PermissionGate>,
    camera: Arc<MockCamera>,
    analyzer: Arc<dyn AnalysisService>,
) -> Harness {
    let router = Arc::new(MockRouter::default());
    let log = Arc::new(StateLog::default());
    let workflow = Workflow::new(
        gate,
        CaptureController::new(camera, 1280, 80),
        analyzer,
        router.clone(),
    )
    .with_observer(log.clone());
    Harness {
        workflow: Arc::new(workflow),
        router,
        log,
    }
}

pub fn granted_gate() -> Arc<PermissionGate> {
    Arc::new(PermissionGate::new(MockPermissions::new(PermissionStatus::Granted)))
}

/// Poll until `pred` holds for the workflow state (or give up after ~2s).
pub async fn wait_for(workflow: &Workflow, pred: impl Fn(&WorkflowState) -> bool) -> WorkflowState {
    for _ in 0..400 {
        let state = workflow.state();
        if pred(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting; state is {:?}", workflow.state().name());
}
