// photo.rs — The immutable product of a successful capture, and the JPEG
// normalisation applied to whatever bytes the camera driver hands back.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Device orientation at the moment of capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

/// A JPEG photo plus its metadata. Created once per successful capture and
/// never modified; clones share the same bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
    captured_at: String,
    orientation: Orientation,
}

impl CapturedImage {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        captured_at: impl Into<String>,
        orientation: Orientation,
    ) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            captured_at: captured_at.into(),
            orientation,
        }
    }

    /// JPEG bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// ISO-8601 UTC timestamp.
    pub fn captured_at(&self) -> &str {
        &self.captured_at
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decode `raw`, downscale to `max_width` if wider, and return JPEG bytes with
/// the final dimensions. JPEG input that needs no resize is passed through
/// untouched to avoid a second lossy encode.
pub fn normalize_jpeg(raw: &[u8], max_width: u32, jpeg_quality: u8) -> Result<(Vec<u8>, u32, u32), String> {
    let img = image::load_from_memory(raw).map_err(|e| format!("decode: {e}"))?;
    let already_jpeg = matches!(image::guess_format(raw), Ok(ImageFormat::Jpeg));

    if img.width() <= max_width && already_jpeg {
        let (w, h) = img.dimensions();
        return Ok((raw.to_vec(), w, h));
    }

    let img = if img.width() > max_width {
        let ratio = max_width as f64 / img.width() as f64;
        let new_h = ((img.height() as f64 * ratio).round() as u32).max(1);
        img.resize_exact(max_width, new_h, imageops::FilterType::Triangle)
    } else {
        img
    };

    let (w, h) = img.dimensions();
    let mut jpeg_buf: Vec<u8> = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_buf, jpeg_quality.clamp(1, 100))
        .encode(img.to_rgb8().as_raw(), w, h, image::ExtendedColorType::Rgb8)
        .map_err(|e| format!("jpeg encode: {e}"))?;

    Ok((jpeg_buf, w, h))
}

/// Current UTC time as an ISO-8601 string with milliseconds.
pub fn now_iso() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let days = secs / 86400;
    let t = secs % 86400;
    let (y, m, d) = epoch_days_to_ymd(days as i64);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        y,
        m,
        d,
        t / 3600,
        (t % 3600) / 60,
        t % 60,
        dur.subsec_millis()
    )
}

/// Convert days since Unix epoch (1970-01-01) to (year, month, day).
pub fn epoch_days_to_ymd(mut days: i64) -> (i64, u32, u32) {
    // Shift epoch to 0000-03-01 so leap days fall at the end of the year.
    days += 719_468;
    let era = if days >= 0 { days } else { days - 146_096 } / 146_097;
    let doe = (days - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
