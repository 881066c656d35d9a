// permission.rs — Camera/microphone access gate.
//
// The gate asks the platform for each capability and remembers grants, so a
// second check after a grant answers immediately without prompting again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::bridge::{Bridge, BridgeRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Camera,
    Microphone,
}

/// What the capture screen needs before it may capture.
pub const CAPTURE_CAPABILITIES: [Capability; 2] = [Capability::Camera, Capability::Microphone];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Undetermined,
}

/// Result of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied(Capability),
}

/// Host platform permission subsystem.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current authorization, without prompting.
    async fn status(&self, capability: Capability) -> PermissionStatus;

    /// Ask the user. May show an OS prompt.
    async fn request(&self, capability: Capability) -> PermissionStatus;
}

pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    granted: Mutex<HashSet<Capability>>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self {
            provider,
            granted: Mutex::new(HashSet::new()),
        }
    }

    /// Ensure every capability in `capabilities` is granted, prompting for the
    /// ones never asked about. A previous denial is reported as-is and not
    /// re-prompted.
    pub async fn check_and_request(&self, capabilities: &[Capability]) -> Access {
        for &capability in capabilities {
            if self.granted.lock().unwrap().contains(&capability) {
                continue;
            }

            let status = match self.provider.status(capability).await {
                PermissionStatus::Undetermined => {
                    log::info!("Requesting {:?} permission", capability);
                    self.provider.request(capability).await
                }
                other => other,
            };

            if status == PermissionStatus::Granted {
                self.granted.lock().unwrap().insert(capability);
            } else {
                log::warn!("{:?} permission denied", capability);
                return Access::Denied(capability);
            }
        }
        Access::Granted
    }

    pub fn is_granted(&self, capability: Capability) -> bool {
        self.granted.lock().unwrap().contains(&capability)
    }
}

/// Question forwarded to the webview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "capability", rename_all = "camelCase")]
pub enum PermissionQuery {
    Status(Capability),
    Request(Capability),
}

/// Provider that asks the webview, which owns the platform permission APIs.
/// An unanswered question counts as `Undetermined` for status and `Denied`
/// for a request.
pub struct WebviewPermissions {
    bridge: Bridge<PermissionQuery, PermissionStatus>,
}

impl WebviewPermissions {
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<BridgeRequest<PermissionQuery>>) {
        let (bridge, rx) = Bridge::new(timeout);
        (Self { bridge }, rx)
    }

    /// Deliver the webview's answer for request `id`.
    pub fn answer(&self, id: u64, status: PermissionStatus) -> bool {
        self.bridge.resolve(id, status)
    }
}

#[async_trait]
impl PermissionProvider for WebviewPermissions {
    async fn status(&self, capability: Capability) -> PermissionStatus {
        match self.bridge.call(PermissionQuery::Status(capability)).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("Permission status query failed: {}", e);
                PermissionStatus::Undetermined
            }
        }
    }

    async fn request(&self, capability: Capability) -> PermissionStatus {
        match self.bridge.call(PermissionQuery::Request(capability)).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("Permission request failed: {}", e);
                PermissionStatus::Denied
            }
        }
    }
}
