//! # Gatecall Core
//!
//! `gatecall-core` lets a gateway invoke any gRPC method, unary or streaming, whose service,
//! method and call shape are only known at request time. Requests are built from JSON, responses
//! are returned as JSON, and the whole asynchronous call is exposed as a single awaitable result.
//!
//! ## Key Components
//!
//! * **[`client::GatewayClient`]:** The main entry point. It builds the messages of a call from
//!   a JSON payload, dispatches it and waits for it to complete.
//! * **[`dispatcher`]:** Picks the invocation pattern (unary, server streaming, client streaming,
//!   bidirectional) from the call type and starts the call on the transport.
//! * **[`completion::CompletionSignal`]:** Turns the lifecycle events of a call into a single
//!   resolution that can be awaited any number of times.
//! * **[`observer::CompositeObserver`]:** Feeds the same events to the caller's response sink and
//!   to the completion signal.
//! * **[`message::MessageAdapter`]:** Builds `prost_reflect::DynamicMessage` values from JSON
//!   using a `DescriptorPool`.
//!
//! ## Transports
//!
//! The dispatcher only talks to the [`transport::Transport`] trait. The crate ships
//! [`grpc::transport::TonicTransport`], which works over a `tonic` `Channel` or over any
//! in-process `tonic` service.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod client;
pub mod completion;
pub mod dispatcher;
pub mod grpc;
pub mod message;
pub mod observer;
pub mod response;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
