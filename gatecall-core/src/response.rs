//! # Response Sink
//!
//! [`MessageWriter`] is the observer that receives the messages of a call and renders each one
//! as JSON. Everything it writes ends up in the paired [`ResponseBuffer`], which is frozen into
//! a [`GrpcResponse`] once the call has completed.
use crate::observer::StreamObserver;
use prost_reflect::DynamicMessage;
use serde::Serialize;
use tokio::sync::mpsc;
use tonic::Status;

/// The caller-visible result of a call: every received message, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrpcResponse {
    pub results: Vec<serde_json::Value>,
}

impl GrpcResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// The single response of a unary or client streaming call.
    pub fn single(&self) -> Option<&serde_json::Value> {
        match self.results.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }
}

/// Receiving end of a [`MessageWriter`].
#[derive(Debug)]
pub struct ResponseBuffer {
    rx: mpsc::UnboundedReceiver<serde_json::Value>,
}

/// Observer writing every received message into a [`ResponseBuffer`].
#[derive(Debug, Clone)]
pub struct MessageWriter {
    tx: mpsc::UnboundedSender<serde_json::Value>,
}

impl ResponseBuffer {
    pub fn new() -> (ResponseBuffer, MessageWriter) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ResponseBuffer { rx }, MessageWriter { tx })
    }

    /// Collects everything written so far.
    ///
    /// Meant to be called once the call has resolved: by then every message has already been
    /// handed to the writer.
    pub fn freeze(mut self) -> GrpcResponse {
        let mut results = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            results.push(value);
        }
        GrpcResponse { results }
    }
}

impl StreamObserver<DynamicMessage> for MessageWriter {
    fn on_next(&mut self, message: DynamicMessage) -> Result<(), Status> {
        let value = serde_json::to_value(&message).map_err(|e| {
            Status::internal(format!("Failed to map response to JSON: {}", e))
        })?;

        // The buffer may have been dropped by a caller that only cares about completion.
        let _ = self.tx.send(value);
        Ok(())
    }

    fn on_error(&mut self, _status: Status) {}

    fn on_completed(&mut self) {}
}
