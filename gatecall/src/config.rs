//! # Config
//!
//! Optional JSON config file holding the defaults of a call. Flags given on the command line
//! always win over the file.
//!
//! ```json
//! {
//!   "url": "http://localhost:50051",
//!   "file_descriptor_set": "descriptor.bin",
//!   "deadline_ms": 5000,
//!   "headers": { "authorization": "Bearer token" }
//! }
//! ```
use anyhow::{Context, Result};
use gatecall_core::transport::CallOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the current directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "gatecall.json";

#[derive(Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub url: Option<String>,
    pub file_descriptor_set: Option<PathBuf>,
    pub deadline_ms: Option<u64>,
    pub headers: BTreeMap<String, String>,
}

impl Config {
    /// Loads `path`, or `gatecall.json` if it exists, or the empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file '{}'", path.display()))?;

        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;

        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn url(&self, flag: Option<String>) -> Result<String> {
        flag.or_else(|| self.url.clone())
            .context("No server URL given: pass --url or set \"url\" in the config file")
    }

    /// Reads the descriptor set named by the flag or the config file.
    pub fn file_descriptor_set(&self, flag: Option<PathBuf>) -> Result<Vec<u8>> {
        let path = flag
            .or_else(|| self.file_descriptor_set.clone())
            .context("No file descriptor set given: pass --file-descriptor-set or set \"file_descriptor_set\" in the config file")?;

        fs::read(&path)
            .with_context(|| format!("Failed to read file descriptor set '{}'", path.display()))
    }

    /// Config headers come first so that a header given on the command line replaces them.
    pub fn call_options(
        &self,
        deadline_ms: Option<u64>,
        headers: &[(String, String)],
    ) -> Result<CallOptions> {
        let options = CallOptions::default()
            .with_headers(&self.headers)
            .and_then(|options| options.with_headers(headers.iter().map(|(k, v)| (k, v))))
            .context("Invalid header")?;

        Ok(match deadline_ms.or(self.deadline_ms) {
            Some(ms) => options.with_deadline(Duration::from_millis(ms)),
            None => options,
        })
    }
}
