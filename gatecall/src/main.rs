//! # Gatecall CLI Entry Point
//!
//! The main executable for the Gatecall tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Installs logging, parses command-line arguments using [`cli::Cli`] and
//!    loads the optional [`config::Config`].
//! 2. **Connection**: Establishes a connection to the target server via `gatecall_core`.
//! 3. **Execution**: Delegates the call to the `GatewayClient`.
//! 4. **Presentation**: Formats and prints the resulting data or error status to standard output/error.

mod cli;
mod config;
mod formatter;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use formatter::{FormattedString, ServiceList};
use gatecall_core::client::{GatewayClient, RequestMetadata};
use gatecall_core::message::{CallType, MessageAdapter};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();

    let args = Cli::parse();
    let config = Config::load(args.config.as_deref()).unwrap_or_else(|err| exit_with(err));

    match args.command {
        Commands::Call {
            endpoint,
            body,
            headers,
            deadline_ms,
            call_type,
        } => {
            let (service, method) = endpoint;
            let request = CallArgs {
                service,
                method,
                body,
                headers,
                deadline_ms,
                call_type,
            };
            run_call(&config, args.url, args.file_descriptor_set, request).await;
        }
        Commands::List => list_services(&config, args.file_descriptor_set),
    }
}

/// Logs go to stderr so that stdout only carries results.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

fn exit_with(err: impl Into<FormattedString>) -> ! {
    eprintln!("{}", err.into());
    process::exit(1);
}

struct CallArgs {
    service: String,
    method: String,
    body: serde_json::Value,
    headers: Vec<(String, String)>,
    deadline_ms: Option<u64>,
    call_type: Option<CallType>,
}

fn list_services(config: &Config, file_descriptor_set: Option<std::path::PathBuf>) {
    let bytes = config
        .file_descriptor_set(file_descriptor_set)
        .unwrap_or_else(|err| exit_with(err));

    match MessageAdapter::decode(&bytes) {
        Ok(adapter) => println!("{}", FormattedString::from(ServiceList(adapter.list_services()))),
        Err(err) => exit_with(err),
    }
}

async fn run_call(
    config: &Config,
    url: Option<String>,
    file_descriptor_set: Option<std::path::PathBuf>,
    args: CallArgs,
) {
    let url = config.url(url).unwrap_or_else(|err| exit_with(err));
    let descriptor = config
        .file_descriptor_set(file_descriptor_set)
        .unwrap_or_else(|err| exit_with(err));
    let options = config
        .call_options(args.deadline_ms, &args.headers)
        .unwrap_or_else(|err| exit_with(err));

    let metadata = RequestMetadata {
        service: args.service,
        method: args.method,
        call_type: args.call_type,
    };

    let client = match GatewayClient::connect(&url, &descriptor).await {
        Ok(client) => client,
        Err(err) => exit_with(err),
    };

    let result = client.call(&metadata, options, &args.body.to_string()).await;
    client.close();

    match result {
        Ok(response) => println!("{}", FormattedString::from(response)),
        Err(err) => exit_with(err),
    }
}
