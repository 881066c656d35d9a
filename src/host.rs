// host.rs — Tauri shell: commands the webview invokes and events it listens to.
//
// Events emitted:
//   workflow:view       rendered `View` after every transition
//   navigate            router destination
//   camera:request      camera initialise/capture for the webview to serve
//   permission:request  permission status/prompt for the webview to serve

use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tauri::{AppHandle, Emitter, Manager};
use tokio::sync::mpsc;

use crate::analysis::HttpAnalysisClient;
use crate::bridge::BridgeRequest;
use crate::capture::webview::WebviewCamera;
use crate::capture::{CaptureController, Facing, FlashMode, Orientation};
use crate::navigation::{NavigationPayload, Navigator};
use crate::permission::{PermissionGate, PermissionStatus, WebviewPermissions};
use crate::presentation::{render, View};
use crate::settings::Settings;
use crate::workflow::{StateObserver, Workflow, WorkflowState};

/// Bridge request as sent to the webview: the id plus the flattened payload.
#[derive(Clone, Serialize)]
struct BridgeEvent<'a, T: Serialize + Clone> {
    id: u64,
    #[serde(flatten)]
    request: &'a T,
}

/// Emits `workflow:view` for each transition.
struct ViewEmitter(AppHandle);

impl StateObserver for ViewEmitter {
    fn on_transition(&self, state: &WorkflowState) {
        if let Err(e) = self.0.emit("workflow:view", render(state)) {
            log::error!("Failed to emit workflow:view: {}", e);
        }
    }
}

/// Routes through the webview's router.
struct EventNavigator(AppHandle);

impl Navigator for EventNavigator {
    fn navigate_to(&self, screen: &str, params: serde_json::Map<String, serde_json::Value>) {
        log::info!("Navigating to {}", screen);
        let payload = NavigationPayload {
            screen: screen.to_string(),
            params,
        };
        if let Err(e) = self.0.emit("navigate", payload) {
            log::error!("Failed to emit navigate: {}", e);
        }
    }
}

/// Managed state shared by all commands.
pub struct AppState {
    settings: Mutex<Settings>,
    settings_path: PathBuf,
    gate: Arc<PermissionGate>,
    permissions: Arc<WebviewPermissions>,
    camera: Arc<WebviewCamera>,
    workflow: Mutex<Option<Arc<Workflow>>>,
}

impl AppState {
    fn current(&self) -> Result<Arc<Workflow>, String> {
        self.workflow
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| "Capture screen is not open".to_string())
    }
}

/// Drain a bridge receiver, forwarding each request to the webview.
fn forward_requests<T: Serialize + Clone + Send + 'static>(
    app_handle: AppHandle,
    event: &'static str,
    mut rx: mpsc::UnboundedReceiver<BridgeRequest<T>>,
) {
    tauri::async_runtime::spawn(async move {
        while let Some(req) = rx.recv().await {
            log::debug!("Forwarding {} #{}", event, req.id);
            let payload = BridgeEvent {
                id: req.id,
                request: &req.payload,
            };
            if let Err(e) = app_handle.emit(event, payload) {
                log::error!("Failed to emit {}: {}", event, e);
            }
        }
    });
}

/// Open the capture screen: a fresh workflow instance replaces (and
/// abandons) any previous one, then permission checks start.
#[tauri::command]
async fn open_capture_screen(
    state: tauri::State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<View, String> {
    let settings = state.settings.lock().unwrap().clone();
    let analyzer = HttpAnalysisClient::new(
        &settings.analysis_endpoint,
        settings.schema(),
        settings.request_timeout(),
    )?;
    let camera = CaptureController::new(
        Arc::clone(&state.camera) as Arc<dyn crate::capture::CameraDriver>,
        settings.max_image_width,
        settings.jpeg_quality,
    );

    let workflow = Arc::new(
        Workflow::new(
            Arc::clone(&state.gate),
            camera,
            Arc::new(analyzer),
            Arc::new(EventNavigator(app_handle.clone())),
        )
        .with_observer(Arc::new(ViewEmitter(app_handle)))
        .with_destinations(settings.destinations()),
    );

    if let Some(previous) = state.workflow.lock().unwrap().replace(Arc::clone(&workflow)) {
        previous.abandon();
    }

    let view = workflow.view();
    tauri::async_runtime::spawn(async move {
        if let Err(e) = workflow.start().await {
            log::warn!("Workflow start: {}", e);
        }
    });
    Ok(view)
}

/// Take a picture and upload it. Resolves when the cycle ends; progress is
/// reported through `workflow:view`.
#[tauri::command]
async fn capture_photo(state: tauri::State<'_, AppState>) -> Result<(), String> {
    let workflow = state.current()?;
    workflow.request_capture().await.map_err(|e| e.to_string())
}

#[tauri::command]
async fn retry(state: tauri::State<'_, AppState>) -> Result<(), String> {
    let workflow = state.current()?;
    workflow.retry().await.map_err(|e| e.to_string())
}

#[tauri::command]
fn navigate_back(state: tauri::State<'_, AppState>) {
    if let Some(workflow) = state.workflow.lock().unwrap().take() {
        workflow.navigate_back();
    }
}

#[tauri::command]
fn current_view(state: tauri::State<'_, AppState>) -> Option<View> {
    state.current().ok().map(|w| w.view())
}

#[tauri::command]
fn toggle_flash(state: tauri::State<'_, AppState>) -> Result<FlashMode, String> {
    Ok(state.current()?.camera().toggle_flash())
}

#[tauri::command]
fn toggle_facing(state: tauri::State<'_, AppState>) -> Result<Facing, String> {
    Ok(state.current()?.camera().toggle_facing())
}

#[tauri::command]
fn camera_ready(state: tauri::State<'_, AppState>, id: u64) -> bool {
    state.camera.ready(id)
}

#[tauri::command]
fn deliver_frame(
    state: tauri::State<'_, AppState>,
    id: u64,
    data: String,
    orientation: Option<Orientation>,
) -> bool {
    state
        .camera
        .deliver_frame(id, &data, orientation.unwrap_or_default())
}

#[tauri::command]
fn camera_failed(state: tauri::State<'_, AppState>, id: u64, reason: String) -> bool {
    state.camera.fail(id, reason)
}

#[tauri::command]
fn answer_permission(state: tauri::State<'_, AppState>, id: u64, status: PermissionStatus) -> bool {
    state.permissions.answer(id, status)
}

#[tauri::command]
fn load_settings(state: tauri::State<'_, AppState>) -> Settings {
    state.settings.lock().unwrap().clone()
}

#[tauri::command]
fn save_settings(state: tauri::State<'_, AppState>, settings: Settings) -> Result<(), String> {
    settings.save(&state.settings_path)?;
    *state.settings.lock().unwrap() = settings;
    Ok(())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .invoke_handler(tauri::generate_handler![
            open_capture_screen,
            capture_photo,
            retry,
            navigate_back,
            current_view,
            toggle_flash,
            toggle_facing,
            camera_ready,
            deliver_frame,
            camera_failed,
            answer_permission,
            load_settings,
            save_settings,
        ])
        .setup(|app| {
            let config_dir = app.path().app_config_dir()?;
            let settings_path = config_dir.join("settings.toml");
            let settings = Settings::load(&settings_path).unwrap_or_else(|e| {
                log::error!("Ignoring unreadable settings: {}", e);
                Settings::default()
            });
            if settings.analysis_endpoint.is_empty() {
                log::warn!("Analysis endpoint is not configured yet");
            }

            let (permissions, permission_rx) = WebviewPermissions::new(settings.bridge_timeout());
            let (camera, camera_rx) = WebviewCamera::new(settings.bridge_timeout());
            let permissions = Arc::new(permissions);

            forward_requests(app.handle().clone(), "permission:request", permission_rx);
            forward_requests(app.handle().clone(), "camera:request", camera_rx);

            app.manage(AppState {
                settings: Mutex::new(settings),
                settings_path,
                gate: Arc::new(PermissionGate::new(
                    Arc::clone(&permissions) as Arc<dyn crate::permission::PermissionProvider>
                )),
                permissions,
                camera: Arc::new(camera),
                workflow: Mutex::new(None),
            });
            log::info!("Aural Eyes ready");
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
