// webview.rs — Camera driver backed by the webview's camera.
//
// `initialize` and `capture` are posted as `camera:request` events; the
// webview answers through `deliver_frame` / `camera_ready` / `camera_failed`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

use super::camera::{CameraDriver, CaptureOptions, RawCapture};
use super::photo::Orientation;
use crate::bridge::{Bridge, BridgeRequest};

/// What the webview is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CameraCommand {
    Initialize,
    Capture { options: CaptureOptions },
}

/// The webview's answer. `Ok(None)` acknowledges an `Initialize`.
pub type CameraReply = Result<Option<RawCapture>, String>;

pub struct WebviewCamera {
    bridge: Bridge<CameraCommand, CameraReply>,
}

impl WebviewCamera {
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<BridgeRequest<CameraCommand>>) {
        let (bridge, rx) = Bridge::new(timeout);
        (Self { bridge }, rx)
    }

    /// Camera finished initialising for request `id`.
    pub fn ready(&self, id: u64) -> bool {
        self.bridge.resolve(id, Ok(None))
    }

    /// A base64 JPEG (optionally a `data:` URL) for request `id`.
    pub fn deliver_frame(&self, id: u64, data: &str, orientation: Orientation) -> bool {
        let reply = decode_frame(data).map(|bytes| {
            Some(RawCapture {
                data: bytes,
                orientation,
            })
        });
        self.bridge.resolve(id, reply)
    }

    /// The webview's camera reported an error for request `id`.
    pub fn fail(&self, id: u64, reason: impl Into<String>) -> bool {
        self.bridge.resolve(id, Err(reason.into()))
    }
}

#[async_trait]
impl CameraDriver for WebviewCamera {
    async fn initialize(&self) -> Result<(), String> {
        self.bridge
            .call(CameraCommand::Initialize)
            .await
            .map_err(|e| e.to_string())?
            .map(|_| ())
    }

    async fn capture(&self, options: CaptureOptions) -> Result<RawCapture, String> {
        self.bridge
            .call(CameraCommand::Capture { options })
            .await
            .map_err(|e| e.to_string())??
            .ok_or_else(|| "camera answered without a picture".to_string())
    }
}

/// Decode a base64 frame, accepting a `data:image/...;base64,` prefix.
pub fn decode_frame(data: &str) -> Result<Vec<u8>, String> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 frame: {e}"))?;
    if bytes.is_empty() {
        return Err("empty frame".into());
    }
    Ok(bytes)
}
