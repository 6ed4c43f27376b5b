//! # Tonic Transport
//!
//! This module wraps a standard `tonic` client to provide a [`Transport`] that is agnostic to
//! the specific Protobuf messages being exchanged.
//!
//! ## How it works
//!
//! [`TonicTransport`] uses the [`super::codec::DynamicCodec`] to handle serialization, so it
//! only needs the request and response descriptors of a method to call it.
//!
//! Each invocation spawns a Tokio task that performs the call and reports its lifecycle to the
//! observer: every received message through `on_next`, then `on_completed` or `on_error`.
//!
//! ## Features
//!
//! * **Dynamic Pathing**: Constructs the HTTP/2 path (e.g., `/package.Service/Method`) at runtime.
//! * **Call Options**: Metadata is sent as request headers. The deadline is sent as
//!   `grpc-timeout` and also enforced locally.
//! * **Shutdown**: Once shut down, in-flight calls fail with `UNAVAILABLE` and new calls fail
//!   right away.
use super::codec::DynamicCodec;
use crate::{
    BoxError,
    message::MethodSignature,
    observer::BoxObserver,
    transport::{CallOptions, RequestSender, Transport},
};
use futures_util::future::BoxFuture;
use http::uri::PathAndQuery;
use http_body::Body as HttpBody;
use prost_reflect::DynamicMessage;
use std::{future::Future, time::Duration};
use tokio::sync::watch;
use tonic::{Status, Streaming, client::GrpcService, transport::Channel};

/// A call prepared by [`TonicTransport::new_call`].
#[derive(Debug)]
pub struct TonicCall {
    path: Result<PathAndQuery, Status>,
    codec: DynamicCodec,
    options: CallOptions,
}

enum Reply {
    Single(DynamicMessage),
    Stream(Streaming<DynamicMessage>),
}

/// A [`Transport`] over any `tonic` gRPC service, a [`Channel`] by default.
///
/// Invocations spawn Tokio tasks, so they must be made from within a Tokio runtime.
pub struct TonicTransport<S = Channel> {
    client: tonic::client::Grpc<S>,
    shutdown: watch::Sender<bool>,
}

impl<S> std::fmt::Debug for TonicTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TonicTransport")
            .field("shut_down", &*self.shutdown.borrow())
            .finish_non_exhaustive()
    }
}

impl<S> TonicTransport<S> {
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        let (shutdown, _) = watch::channel(false);
        Self { client, shutdown }
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl<S> TonicTransport<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Runs `call` in its own task and reports its lifecycle to `observer`.
    fn spawn(
        &self,
        path: String,
        deadline: Option<Duration>,
        mut observer: BoxObserver,
        call: BoxFuture<'static, Result<Reply, Status>>,
    ) {
        let shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let outcome = {
                let exchange = with_deadline(deadline, deliver(call, &mut observer));
                tokio::select! {
                    biased;
                    _ = shut_down(shutdown) => Err(Status::unavailable("Channel was shut down")),
                    outcome = exchange => outcome,
                }
            };

            match outcome {
                Ok(()) => {
                    tracing::debug!(%path, "Call completed");
                    observer.on_completed();
                }
                Err(status) => {
                    tracing::debug!(
                        %path,
                        code = ?status.code(),
                        message = status.message(),
                        "Call failed"
                    );
                    observer.on_error(status);
                }
            }
        });
    }
}

impl<S> Transport for TonicTransport<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    type Call = TonicCall;

    fn new_call(&self, method: &MethodSignature, options: &CallOptions) -> TonicCall {
        TonicCall {
            path: http_path(method),
            codec: DynamicCodec::new(method.request.clone(), method.response.clone()),
            options: options.clone(),
        }
    }

    fn unary(&self, call: TonicCall, request: DynamicMessage, observer: BoxObserver) {
        let mut client = self.client.clone();
        let (path, deadline) = describe(&call);

        self.spawn(
            path,
            deadline,
            observer,
            Box::pin(async move {
                let TonicCall {
                    path,
                    codec,
                    options,
                } = call;
                let path = path?;
                ready(&mut client).await?;

                let response = client
                    .unary(build_request(request, options), path, codec)
                    .await?;
                Ok(Reply::Single(response.into_inner()))
            }),
        );
    }

    fn server_streaming(&self, call: TonicCall, request: DynamicMessage, observer: BoxObserver) {
        let mut client = self.client.clone();
        let (path, deadline) = describe(&call);

        self.spawn(
            path,
            deadline,
            observer,
            Box::pin(async move {
                let TonicCall {
                    path,
                    codec,
                    options,
                } = call;
                let path = path?;
                ready(&mut client).await?;

                let response = client
                    .server_streaming(build_request(request, options), path, codec)
                    .await?;
                Ok(Reply::Stream(response.into_inner()))
            }),
        );
    }

    fn client_streaming(&self, call: TonicCall, observer: BoxObserver) -> RequestSender {
        let mut client = self.client.clone();
        let (path, deadline) = describe(&call);
        let (sender, requests) = RequestSender::new();

        self.spawn(
            path,
            deadline,
            observer,
            Box::pin(async move {
                let TonicCall {
                    path,
                    codec,
                    options,
                } = call;
                let path = path?;
                ready(&mut client).await?;

                let response = client
                    .client_streaming(build_request(requests, options), path, codec)
                    .await?;
                Ok(Reply::Single(response.into_inner()))
            }),
        );

        sender
    }

    fn bidi_streaming(&self, call: TonicCall, observer: BoxObserver) -> RequestSender {
        let mut client = self.client.clone();
        let (path, deadline) = describe(&call);
        let (sender, requests) = RequestSender::new();

        self.spawn(
            path,
            deadline,
            observer,
            Box::pin(async move {
                let TonicCall {
                    path,
                    codec,
                    options,
                } = call;
                let path = path?;
                ready(&mut client).await?;

                let response = client
                    .streaming(build_request(requests, options), path, codec)
                    .await?;
                Ok(Reply::Stream(response.into_inner()))
            }),
        );

        sender
    }

    fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Transport shut down");
        }
    }
}

/// Feeds the call's responses to the observer. Stops at the first failure.
async fn deliver<F>(call: F, observer: &mut BoxObserver) -> Result<(), Status>
where
    F: Future<Output = Result<Reply, Status>>,
{
    match call.await? {
        Reply::Single(message) => observer.on_next(message),
        Reply::Stream(mut stream) => {
            while let Some(message) = stream.message().await? {
                observer.on_next(message)?;
            }
            Ok(())
        }
    }
}

async fn with_deadline<F>(deadline: Option<Duration>, exchange: F) -> Result<(), Status>
where
    F: Future<Output = Result<(), Status>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, exchange)
            .await
            .unwrap_or_else(|_| {
                Err(Status::deadline_exceeded(format!(
                    "Deadline of {deadline:?} exceeded"
                )))
            }),
        None => exchange.await,
    }
}

/// Resolves once the transport is shut down (or dropped).
async fn shut_down(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

async fn ready<S>(client: &mut tonic::client::Grpc<S>) -> Result<(), Status>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
{
    client
        .ready()
        .await
        .map_err(|e| Status::unavailable(format!("Client was not ready: '{}'", e.into())))
}

fn describe(call: &TonicCall) -> (String, Option<Duration>) {
    let path = match &call.path {
        Ok(path) => path.to_string(),
        Err(_) => "<invalid path>".to_string(),
    };
    (path, call.options.deadline)
}

fn http_path(method: &MethodSignature) -> Result<PathAndQuery, Status> {
    let path = method.path();
    PathAndQuery::try_from(path.as_str()).map_err(|e| {
        Status::invalid_argument(format!("Invalid gRPC path '{path}': {e}"))
    })
}

fn build_request<T>(payload: T, options: CallOptions) -> tonic::Request<T> {
    let mut request = tonic::Request::new(payload);
    *request.metadata_mut() = options.metadata;
    if let Some(deadline) = options.deadline {
        request.set_timeout(deadline);
    }
    request
}
