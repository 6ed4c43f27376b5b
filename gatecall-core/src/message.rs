//! # Dynamic Message Adapter
//!
//! Builds `prost_reflect::DynamicMessage` values for methods that are only known at runtime.
//!
//! The adapter owns a [`DescriptorPool`] (usually decoded from a binary `FileDescriptorSet`)
//! and uses it to:
//!
//! * Resolve a `service` / `method` pair into a [`MethodDescriptor`].
//! * Turn a JSON document into a request message, validating it against the method's input schema.
//! * Produce an empty message of the method's output schema, used as the response shape.
//! * Bind both shapes together with the service and method names into a [`MethodSignature`].
use prost_reflect::{
    DescriptorError, DescriptorPool, DynamicMessage, MessageDescriptor, MethodDescriptor,
    ReflectMessage,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),
    #[error("Method '{method}' not found in service '{service}'")]
    MethodNotFound { service: String, method: String },
    #[error("JSON payload does not match the schema of '{message}': '{source}'")]
    InvalidPayload {
        message: String,
        source: serde_json::Error,
    },
}

/// Classification of an RPC method by the cardinality of its request and response.
///
/// Tags coming from external metadata that do not match any known shape deserialize
/// to [`CallType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BidiStreaming,
    #[serde(other)]
    Unknown,
}

impl CallType {
    /// Parses a call-type tag. Unrecognized tags map to [`CallType::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "UNARY" => CallType::Unary,
            "SERVER_STREAMING" => CallType::ServerStreaming,
            "CLIENT_STREAMING" => CallType::ClientStreaming,
            "BIDI_STREAMING" => CallType::BidiStreaming,
            _ => CallType::Unknown,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            CallType::Unary => "UNARY",
            CallType::ServerStreaming => "SERVER_STREAMING",
            CallType::ClientStreaming => "CLIENT_STREAMING",
            CallType::BidiStreaming => "BIDI_STREAMING",
            CallType::Unknown => "UNKNOWN",
        }
    }
}

impl From<&MethodDescriptor> for CallType {
    fn from(method: &MethodDescriptor) -> Self {
        match (method.is_client_streaming(), method.is_server_streaming()) {
            (false, false) => CallType::Unary,
            (false, true) => CallType::ServerStreaming,
            (true, false) => CallType::ClientStreaming,
            (true, true) => CallType::BidiStreaming,
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Everything needed to address one remote procedure and to (de)serialize its messages.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    /// Fully qualified service name (e.g. `greeter.Greeter`).
    pub service: String,
    /// Method name (e.g. `SayHello`).
    pub method: String,
    pub call_type: CallType,
    /// Schema of the request message.
    pub request: MessageDescriptor,
    /// Schema of the response message.
    pub response: MessageDescriptor,
}

impl MethodSignature {
    /// The HTTP/2 path of the method (e.g. `/greeter.Greeter/SayHello`).
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

/// Builds dynamic messages from a [`DescriptorPool`].
#[derive(Debug, Clone)]
pub struct MessageAdapter {
    pool: DescriptorPool,
}

impl MessageAdapter {
    pub fn new(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// Creates an adapter from the bytes of an encoded `FileDescriptorSet`.
    pub fn decode(file_descriptor_set: &[u8]) -> Result<Self, DescriptorError> {
        let pool = DescriptorPool::decode(file_descriptor_set)?;
        Ok(Self { pool })
    }

    /// Lists all the fully qualified service names known to the adapter.
    pub fn list_services(&self) -> Vec<String> {
        self.pool
            .services()
            .map(|s| s.full_name().to_string())
            .collect()
    }

    /// Looks up a method.
    ///
    /// `service` is usually fully qualified (`greeter.Greeter`), but a bare service name
    /// (`Greeter`) is accepted as long as it is unique in the pool.
    pub fn find_method(
        &self,
        service: &str,
        method: &str,
    ) -> Result<MethodDescriptor, AdapterError> {
        let descriptor = match self.pool.get_service_by_name(service) {
            Some(descriptor) => descriptor,
            None => {
                let mut matches = self.pool.services().filter(|s| s.name() == service);
                match (matches.next(), matches.next()) {
                    (Some(descriptor), None) => descriptor,
                    _ => return Err(AdapterError::ServiceNotFound(service.to_string())),
                }
            }
        };

        descriptor
            .methods()
            .find(|m| m.name() == method)
            .ok_or_else(|| AdapterError::MethodNotFound {
                service: descriptor.full_name().to_string(),
                method: method.to_string(),
            })
    }

    /// Builds a request message for `method` out of a JSON document.
    ///
    /// Fails if the document is not valid JSON, has trailing data, or does not fit the
    /// method's input schema (unknown fields, mismatched types...).
    pub fn build_request(
        &self,
        method: &MethodDescriptor,
        json: &str,
    ) -> Result<DynamicMessage, AdapterError> {
        let descriptor = method.input();
        let invalid = |source| AdapterError::InvalidPayload {
            message: descriptor.full_name().to_string(),
            source,
        };

        let mut deserializer = serde_json::Deserializer::from_str(json);
        let message = DynamicMessage::deserialize(descriptor.clone(), &mut deserializer)
            .map_err(invalid)?;
        deserializer.end().map_err(invalid)?;

        Ok(message)
    }

    /// Builds an empty message with the shape of the method's response.
    pub fn build_empty_response(&self, method: &MethodDescriptor) -> DynamicMessage {
        DynamicMessage::new(method.output())
    }

    /// Binds the request and response shapes to a service and method name.
    pub fn method_signature(
        &self,
        service: &str,
        method: &str,
        call_type: CallType,
        request: &DynamicMessage,
        response: &DynamicMessage,
    ) -> MethodSignature {
        MethodSignature {
            service: service.to_string(),
            method: method.to_string(),
            call_type,
            request: request.descriptor(),
            response: response.descriptor(),
        }
    }
}
