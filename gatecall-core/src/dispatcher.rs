//! # Call Dispatcher
//!
//! Selects the invocation pattern of a call from its [`CallType`] and starts it on the transport.
//!
//! The caller's response observer is composed with an internal [`CompletionSignal`], so the
//! transport feeds both with the same events. The dispatcher hands back the signal's
//! [`Completion`], which resolves once the call finishes.
//!
//! Client streaming and bidirectional calls send exactly one request (the one carried by the
//! descriptor) and half-close the request stream right after.
use crate::{
    completion::{Completion, CompletionSignal},
    message::{CallType, MethodSignature},
    observer::{BoxObserver, CompositeObserver},
    transport::{CallOptions, RequestSender, Transport},
};
use prost_reflect::DynamicMessage;
use std::sync::Arc;

/// Everything required to perform one call. Built fresh for every call and consumed by it.
pub struct CallDescriptor<T> {
    pub method: MethodSignature,
    pub request: DynamicMessage,
    /// Receives every lifecycle event of the call.
    pub observer: BoxObserver,
    pub channel: Arc<T>,
    pub options: CallOptions,
}

impl<T> std::fmt::Debug for CallDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallDescriptor")
            .field("method", &self.method)
            .field("request", &self.request)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Starts the call described by `descriptor`.
///
/// Returns `None`, without touching the transport, when the call type is
/// [`CallType::Unknown`]. Otherwise exactly one call is started and its completion handle
/// is returned.
pub fn dispatch<T: Transport>(descriptor: CallDescriptor<T>) -> Option<Completion> {
    let CallDescriptor {
        method,
        request,
        observer,
        channel,
        options,
    } = descriptor;

    tracing::debug!(
        service = %method.service,
        method = %method.method,
        call_type = %method.call_type,
        "Dispatching call"
    );

    let (signal, completion) = CompletionSignal::new();
    let observer: BoxObserver = Box::new(CompositeObserver::new(observer, signal));
    let new_call = || channel.new_call(&method, &options);

    match method.call_type {
        CallType::Unary => channel.unary(new_call(), request, observer),
        CallType::ServerStreaming => channel.server_streaming(new_call(), request, observer),
        CallType::ClientStreaming => {
            send_single(channel.client_streaming(new_call(), observer), request)
        }
        CallType::BidiStreaming => {
            send_single(channel.bidi_streaming(new_call(), observer), request)
        }
        CallType::Unknown => {
            tracing::warn!(
                service = %method.service,
                method = %method.method,
                "Unknown call type, no call was made"
            );
            return None;
        }
    }

    Some(completion)
}

fn send_single(sender: RequestSender, request: DynamicMessage) {
    // A failed send means the call already ended; its observer gets the terminal event.
    if let Err(status) = sender.send(request) {
        tracing::debug!(%status, "Request stream closed before the request was sent");
    }
    sender.complete();
}
