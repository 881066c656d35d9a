use serde::Serialize;
use serde_json::{Map, Value};

/// Screen router owned by the app shell.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, screen: &str, params: Map<String, Value>);
}

/// Payload emitted on `navigate` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationPayload {
    pub screen: String,
    pub params: Map<String, Value>,
}
