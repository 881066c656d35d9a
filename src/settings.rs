use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::analysis::ResultSchema;
use crate::workflow::Destinations;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// POST target for pictures. Empty until the user configures it.
    pub analysis_endpoint: String,
    /// Upload timeout; unset means wait for the network stack.
    pub request_timeout_secs: Option<u64>,
    pub jpeg_quality: u8,
    pub max_image_width: u32,
    /// Fields a success response must contain.
    pub required_fields: Vec<String>,
    pub result_screen: String,
    pub home_screen: String,
    /// How long to wait for the webview to answer a camera/permission request.
    pub bridge_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let destinations = Destinations::default();
        Self {
            analysis_endpoint: String::new(),
            request_timeout_secs: None,
            jpeg_quality: 80,
            max_image_width: 1280,
            required_fields: ResultSchema::default().required_fields,
            result_screen: destinations.result_screen,
            home_screen: destinations.home_screen,
            bridge_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file does
    /// not exist yet.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        toml::from_str(&content).map_err(|e| e.to_string())
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| e.to_string())?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, content).map_err(|e| e.to_string())?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs.max(1))
    }

    pub fn schema(&self) -> ResultSchema {
        ResultSchema::new(self.required_fields.iter().cloned())
    }

    pub fn destinations(&self) -> Destinations {
        Destinations {
            result_screen: self.result_screen.clone(),
            home_screen: self.home_screen.clone(),
        }
    }
}
