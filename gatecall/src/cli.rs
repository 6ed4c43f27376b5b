//! # CLI
//!
//! This module defines the command-line interface of `gatecall` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring headers are `key:value`).
//! Connection settings can also come from the config file, see [`crate::config`].
use clap::{Parser, Subcommand};
use gatecall_core::message::CallType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gatecall", version, about = "Dynamic gRPC gateway calls from JSON")]
pub struct Cli {
    /// Path to a JSON config file [default: ./gatecall.json when present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The server URL to connect to (e.g. http://localhost:50051)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Path to the descriptor set (.bin) describing the server's services
    #[arg(long, global = true)]
    pub file_descriptor_set: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Perform a gRPC call to a server
    ///
    /// The request message is built from the JSON body. Every response message is printed as JSON.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// gatecall --url http://localhost:50051 --file-descriptor-set descriptor.bin \
    ///     call greeter.Greeter/SayHello --body '{"name": "world"}'
    /// ```
    Call {
        /// Endpoint (package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: (String, String),

        /// JSON body of the request message
        #[arg(long, value_parser = parse_body)]
        body: serde_json::Value,

        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Deadline of the call in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Call type tag (UNARY, SERVER_STREAMING, CLIENT_STREAMING, BIDI_STREAMING).
        /// Taken from the method definition when omitted.
        #[arg(long, value_parser = parse_call_type)]
        call_type: Option<CallType>,
    },

    /// List the services of the descriptor set
    List,
}

fn parse_endpoint(value: &str) -> Result<(String, String), String> {
    let (service, method) = value.split_once('/').ok_or_else(|| {
        format!("Invalid endpoint format: '{value}'. Expected 'package.Service/Method'",)
    })?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and Method names cannot be empty".to_string());
    }

    Ok((service.to_string(), method.to_string()))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

fn parse_body(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))
}

// Unrecognized tags are accepted: such a call is never started and yields no responses.
fn parse_call_type(value: &str) -> Result<CallType, String> {
    Ok(CallType::from_tag(value))
}
