/// The `capture` module owns the device camera: its lifecycle, the pictures it
/// produces, and the webview-backed driver used by the app shell.
pub mod camera;
pub mod photo;
pub mod webview;

pub use camera::{CameraDriver, CameraState, CaptureController, CaptureOptions, Facing, FlashMode, RawCapture};
pub use photo::{CapturedImage, Orientation};
