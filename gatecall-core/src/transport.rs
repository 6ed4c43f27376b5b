//! # Transport
//!
//! The [`Transport`] trait is the seam between the dispatcher and the wire. It exposes one
//! entry point per call shape, all of them non-blocking: the transport starts the call and
//! reports its lifecycle to the given observer from its own task.
//!
//! The production implementation is [`crate::grpc::transport::TonicTransport`].
use crate::{message::MethodSignature, observer::BoxObserver};
use prost_reflect::DynamicMessage;
use std::{str::FromStr, time::Duration};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::{
    Status,
    metadata::{
        MetadataKey, MetadataMap, MetadataValue,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
};

#[derive(thiserror::Error, Debug)]
pub enum CallOptionsError {
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
}

/// Per-call settings carried opaquely down to the transport.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Maximum duration of the call. Exceeding it fails the call with `DEADLINE_EXCEEDED`.
    pub deadline: Option<Duration>,
    /// gRPC metadata (headers) sent with the call.
    pub metadata: MetadataMap,
}

impl CallOptions {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Adds an ASCII metadata entry.
    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, CallOptionsError> {
        let name =
            MetadataKey::from_str(key).map_err(|source| CallOptionsError::InvalidMetadataKey {
                key: key.to_string(),
                source,
            })?;
        let val = MetadataValue::from_str(value).map_err(|source| {
            CallOptionsError::InvalidMetadataValue {
                key: key.to_string(),
                source,
            }
        })?;
        self.metadata.insert(name, val);
        Ok(self)
    }

    /// Adds every `(key, value)` pair as metadata.
    pub fn with_headers<I, K, V>(self, headers: I) -> Result<Self, CallOptionsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        headers
            .into_iter()
            .try_fold(self, |options, (k, v)| options.with_header(k.as_ref(), v.as_ref()))
    }
}

/// A channel able to carry dynamic calls of any shape.
///
/// Every invocation returns immediately; lifecycle events are delivered to `observer`
/// from the transport's own task, ending with exactly one terminal event.
pub trait Transport: Send + Sync + 'static {
    /// Transport-specific handle for a single call.
    type Call: Send + 'static;

    /// Prepares a call of `method`.
    fn new_call(&self, method: &MethodSignature, options: &CallOptions) -> Self::Call;

    /// Single request, single response.
    fn unary(&self, call: Self::Call, request: DynamicMessage, observer: BoxObserver);

    /// Single request, stream of responses.
    fn server_streaming(&self, call: Self::Call, request: DynamicMessage, observer: BoxObserver);

    /// Stream of requests, single response.
    fn client_streaming(&self, call: Self::Call, observer: BoxObserver) -> RequestSender;

    /// Stream of requests, stream of responses.
    fn bidi_streaming(&self, call: Self::Call, observer: BoxObserver) -> RequestSender;

    /// Releases the channel. In-flight calls fail, new calls fail immediately.
    ///
    /// Calling it more than once has no further effect.
    fn shutdown(&self);
}

/// Request half of a client streaming or bidirectional call.
#[derive(Debug)]
pub struct RequestSender {
    tx: mpsc::UnboundedSender<DynamicMessage>,
}

/// The stream of requests a transport reads from after handing out a [`RequestSender`].
pub type RequestStream = UnboundedReceiverStream<DynamicMessage>;

impl RequestSender {
    pub fn new() -> (RequestSender, RequestStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RequestSender { tx }, UnboundedReceiverStream::new(rx))
    }

    /// Queues one request message.
    ///
    /// Fails if the call is already over and no longer reads requests.
    pub fn send(&self, request: DynamicMessage) -> Result<(), Status> {
        self.tx
            .send(request)
            .map_err(|_| Status::failed_precondition("Call no longer accepts requests"))
    }

    /// Signals that no more requests will be sent (half-close).
    pub fn complete(self) {
        drop(self.tx);
    }
}
