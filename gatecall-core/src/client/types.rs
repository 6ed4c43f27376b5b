use crate::message::CallType;
use serde::{Deserialize, Serialize};

/// The caller's description of the method to invoke.
///
/// Gateways usually keep these records as JSON, e.g.
/// `{"service": "greeter.Greeter", "method": "SayHello", "callType": "UNARY"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    /// Service name, fully qualified (`greeter.Greeter`) or, if unique, bare (`Greeter`).
    pub service: String,
    /// Method name (e.g. `SayHello`).
    pub method: String,
    /// Call shape. When absent it is taken from the method's descriptor; when present it wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<CallType>,
}

impl RequestMetadata {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            call_type: None,
        }
    }

    pub fn with_call_type(mut self, call_type: CallType) -> Self {
        self.call_type = Some(call_type);
        self
    }
}
