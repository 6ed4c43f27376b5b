//! # Gateway Client
//!
//! This module implements the high-level entry point for executing dynamic gRPC requests.
//!
//! [`GatewayClient`] owns the transport and a [`MessageAdapter`]. A call goes through the
//! following steps:
//!
//! 1. The request message is built from the JSON payload, and an empty response message from
//!    the method's output schema.
//! 2. Both shapes are bound to the service and method names in a [`MethodSignature`].
//! 3. A fresh [`ResponseBuffer`] and its writer are allocated for the call.
//! 4. A [`CallDescriptor`] is assembled and dispatched.
//! 5. The completion is awaited and the buffered responses are returned.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gatecall_core::client::{GatewayClient, RequestMetadata};
//! use gatecall_core::transport::CallOptions;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let descriptor = std::fs::read("descriptor.bin")?;
//! let client = GatewayClient::connect("http://localhost:50051", &descriptor).await?;
//!
//! let metadata = RequestMetadata::new("greeter.Greeter", "SayHello");
//! let response = client
//!     .call(&metadata, CallOptions::default(), r#"{"name": "world"}"#)
//!     .await?;
//!
//! println!("{:?}", response.results);
//! client.close();
//! # Ok(())
//! # }
//! ```
mod types;

pub use types::*;

use crate::{
    BoxError,
    completion::Completion,
    dispatcher::{self, CallDescriptor},
    grpc::transport::TonicTransport,
    message::{AdapterError, CallType, MessageAdapter, MethodSignature},
    response::{GrpcResponse, ResponseBuffer},
    transport::{CallOptions, Transport},
};
use http_body::Body as HttpBody;
use prost_reflect::{DescriptorError, DescriptorPool};
use std::sync::Arc;
use tonic::{
    Status,
    transport::{Channel, Endpoint},
};

/// Errors that can occur when creating a connected client.
#[derive(Debug, thiserror::Error)]
pub enum ClientConnectError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
    #[error("Failed to decode file descriptor set: '{0}'")]
    InvalidDescriptor(#[from] DescriptorError),
}

/// Errors that can occur during a call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Failed to build the call messages: '{0}'")]
    Adapter(#[from] AdapterError),
    #[error("Caught error while waiting for rpc: '{}' (code: {:?})", .0.message(), .0.code())]
    Invocation(#[source] Status),
}

/// Dynamic gRPC client.
///
/// The transport is owned by the client and shut down when the client is closed or dropped.
pub struct GatewayClient<T: Transport = TonicTransport> {
    channel: Arc<T>,
    adapter: MessageAdapter,
}

impl GatewayClient<TonicTransport<Channel>> {
    /// Connects to a gRPC server, using the encoded `FileDescriptorSet` to resolve methods.
    ///
    /// # Arguments
    ///
    /// * `addr` - The server URI (e.g., `http://localhost:50051`).
    /// * `file_descriptor_set` - The binary descriptor set describing the server's services.
    pub async fn connect(
        addr: &str,
        file_descriptor_set: &[u8],
    ) -> Result<Self, ClientConnectError> {
        let adapter = MessageAdapter::decode(file_descriptor_set)?;

        let endpoint = Endpoint::new(addr.to_string())
            .map_err(|e| ClientConnectError::InvalidUrl(addr.to_string(), e))?;

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientConnectError::ConnectionFailed(addr.to_string(), e))?;

        Ok(Self::new(TonicTransport::new(channel), adapter))
    }
}

impl<S> GatewayClient<TonicTransport<S>>
where
    S: tonic::client::GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a client from an existing Tonic service/channel.
    pub fn from_service(service: S, pool: DescriptorPool) -> Self {
        Self::new(TonicTransport::new(service), MessageAdapter::new(pool))
    }
}

impl<T: Transport> GatewayClient<T> {
    pub fn new(channel: T, adapter: MessageAdapter) -> Self {
        Self {
            channel: Arc::new(channel),
            adapter,
        }
    }

    pub fn adapter(&self) -> &MessageAdapter {
        &self.adapter
    }

    /// Shared handle to the transport, for callers assembling their own [`CallDescriptor`]s.
    pub fn channel(&self) -> Arc<T> {
        self.channel.clone()
    }

    /// Lists the services the client knows how to call.
    pub fn list_services(&self) -> Vec<String> {
        self.adapter.list_services()
    }

    /// Performs a call and waits for it to finish.
    ///
    /// # Returns
    ///
    /// * `Ok(GrpcResponse)` - Every message received, in order. Empty if the call type is
    ///   [`CallType::Unknown`], in which case no call is made.
    /// * `Err(CallError::Adapter)` - The method could not be resolved or the payload does not fit
    ///   its schema. Nothing was sent.
    /// * `Err(CallError::Invocation)` - The call failed.
    pub async fn call(
        &self,
        metadata: &RequestMetadata,
        options: CallOptions,
        payload: &str,
    ) -> Result<GrpcResponse, CallError> {
        let method = self
            .adapter
            .find_method(&metadata.service, &metadata.method)?;
        let request = self.adapter.build_request(&method, payload)?;
        let response = self.adapter.build_empty_response(&method);

        let call_type = metadata
            .call_type
            .unwrap_or_else(|| CallType::from(&method));

        let signature: MethodSignature = self.adapter.method_signature(
            method.parent_service().full_name(),
            method.name(),
            call_type,
            &request,
            &response,
        );

        let (buffer, writer) = ResponseBuffer::new();

        let descriptor = CallDescriptor {
            method: signature,
            request,
            observer: Box::new(writer),
            channel: self.channel.clone(),
            options,
        };

        match self.invoke(descriptor) {
            Some(completion) => completion.wait().await.map_err(CallError::Invocation)?,
            None => tracing::warn!(
                service = %metadata.service,
                method = %metadata.method,
                "Returning an empty response for an unknown call type"
            ),
        }

        Ok(buffer.freeze())
    }

    /// Starts the call described by `descriptor` without waiting for it.
    ///
    /// Returns `None` if the call type is [`CallType::Unknown`]; no call is made in that case.
    pub fn invoke(&self, descriptor: CallDescriptor<T>) -> Option<Completion> {
        dispatcher::dispatch(descriptor)
    }

    /// Shuts the transport down. Calls still in flight fail.
    pub fn close(self) {
        drop(self);
    }
}

impl<T: Transport> Drop for GatewayClient<T> {
    fn drop(&mut self) {
        self.channel.shutdown();
    }
}
