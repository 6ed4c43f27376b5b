//! # gRPC Transport
//!
//! This module contains the `tonic` implementation of [`crate::transport::Transport`].
//!
//! Unlike standard `tonic` clients which are strongly typed (e.g., `HelloRequest`),
//! the components here work with `prost_reflect::DynamicMessage` values whose shape is
//! only known at runtime.
pub mod codec;
pub mod transport;
