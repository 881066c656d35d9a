// camera.rs — Camera lifecycle: NotReady → Ready → Capturing → (Ready | Faulted).
//
// The controller is the only owner of the driver. Flash and facing are plain
// toggles that parameterise the next capture and never touch the state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use super::photo::{normalize_jpeg, now_iso, CapturedImage, Orientation};
use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlashMode {
    #[default]
    Off,
    On,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facing {
    #[default]
    Back,
    Front,
}

/// Parameters for the next `capture()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub flash: FlashMode,
    pub facing: Facing,
}

/// Bytes as produced by the driver, before normalisation.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub data: Vec<u8>,
    pub orientation: Orientation,
}

/// Camera hardware driver.
#[async_trait]
pub trait CameraDriver: Send + Sync {
    /// Bring the camera up. Resolves once the hardware reports it is ready.
    async fn initialize(&self) -> Result<(), String>;

    /// Take one picture.
    async fn capture(&self, options: CaptureOptions) -> Result<RawCapture, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraState {
    NotReady,
    Ready,
    Capturing,
    Faulted,
}

pub struct CaptureController {
    driver: Arc<dyn CameraDriver>,
    state: Mutex<CameraState>,
    options: Mutex<CaptureOptions>,
    /// Wider captures are downscaled to this width.
    max_width: u32,
    /// JPEG quality (1–100) used when a capture has to be re-encoded.
    jpeg_quality: u8,
}

impl CaptureController {
    pub fn new(driver: Arc<dyn CameraDriver>, max_width: u32, jpeg_quality: u8) -> Self {
        Self {
            driver,
            state: Mutex::new(CameraState::NotReady),
            options: Mutex::new(CaptureOptions::default()),
            max_width,
            jpeg_quality,
        }
    }

    pub fn state(&self) -> CameraState {
        *self.state.lock().unwrap()
    }

    pub fn options(&self) -> CaptureOptions {
        *self.options.lock().unwrap()
    }

    /// Initialise (or re-initialise after a fault) the driver. A camera that is
    /// already ready is left alone.
    pub async fn initialize(&self) -> Result<(), WorkflowError> {
        {
            let state = self.state.lock().unwrap();
            match *state {
                CameraState::Ready => return Ok(()),
                CameraState::Capturing => {
                    return Err(WorkflowError::capture_failed("Camera is busy"));
                }
                CameraState::NotReady | CameraState::Faulted => {}
            }
        }

        match self.driver.initialize().await {
            Ok(()) => {
                *self.state.lock().unwrap() = CameraState::Ready;
                log::info!("Camera ready");
                Ok(())
            }
            Err(reason) => {
                *self.state.lock().unwrap() = CameraState::Faulted;
                log::error!("Camera initialisation failed: {}", reason);
                Err(WorkflowError::capture_failed(format!(
                    "Could not start camera: {}",
                    reason
                )))
            }
        }
    }

    /// Take one picture. Only valid while `Ready`; otherwise fails without
    /// touching the driver.
    pub async fn capture(&self) -> Result<CapturedImage, WorkflowError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != CameraState::Ready {
                log::warn!("capture() called while camera is {:?}", *state);
                return Err(WorkflowError::capture_failed("Camera is not ready"));
            }
            *state = CameraState::Capturing;
        }

        let options = self.options();
        let raw = match self.driver.capture(options).await {
            Ok(raw) => raw,
            Err(reason) => {
                *self.state.lock().unwrap() = CameraState::Faulted;
                log::error!("Camera capture failed: {}", reason);
                return Err(WorkflowError::capture_failed(reason));
            }
        };

        // The hardware worked; a bad payload does not fault the camera.
        *self.state.lock().unwrap() = CameraState::Ready;

        let (data, width, height) = normalize_jpeg(&raw.data, self.max_width, self.jpeg_quality)
            .map_err(|e| WorkflowError::capture_failed(format!("Unreadable image: {}", e)))?;

        log::info!(
            "Captured {}x{} image ({} bytes, flash={:?}, facing={:?})",
            width,
            height,
            data.len(),
            options.flash,
            options.facing
        );
        Ok(CapturedImage::new(data, width, height, now_iso(), raw.orientation))
    }

    /// Flip the flash setting. Returns the new value.
    pub fn toggle_flash(&self) -> FlashMode {
        let mut options = self.options.lock().unwrap();
        options.flash = match options.flash {
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Off,
        };
        options.flash
    }

    /// Switch between back and front camera. Returns the new value.
    pub fn toggle_facing(&self) -> Facing {
        let mut options = self.options.lock().unwrap();
        options.facing = match options.facing {
            Facing::Back => Facing::Front,
            Facing::Front => Facing::Back,
        };
        options.facing
    }
}
