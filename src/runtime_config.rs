//! # Runtime Configuration Module
//!
//! Settings that shape how the dispatcher runs, layered as:
//!
//! 1. built-in defaults
//! 2. an optional YAML file ([`RuntimeConfig::from_yaml_file`])
//! 3. environment variables
//!
//! ## Environment Variables
//!
//! ### `BRRTD_DEFAULT_MIME`
//!
//! MIME type used when a route declares no `produces`/`consumes` list and the
//! request carries no `Content-Type`. Default: `application/json`.
//!
//! ### `BRRTD_STACK_SIZE`
//!
//! Stack size for coroutines running deferred handlers. Accepts decimal
//! (`16384`) or hexadecimal (`0x4000`). Default: `0x4000` (16 KB).
//!
//! Memory usage is roughly `stack_size × concurrent deferred handlers`.
//!
//! ### `BRRTD_VALIDATE_EXECUTORS`
//!
//! `true`/`false`. When true the dispatcher refuses to start if some route
//! has no execution strategy. Default: `true`.
//!
//! ## Example
//!
//! ```yaml
//! default_mime_type: application/json
//! stack_size: 0x8000
//! validate_executors: true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::path::Path;
use tracing::{info, warn};

const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Fallback MIME type for negotiation
    pub default_mime_type: String,
    /// Coroutine stack size in bytes
    #[serde(deserialize_with = "deserialize_stack_size")]
    pub stack_size: usize,
    /// Fail dispatcher construction on uncovered descriptors
    pub validate_executors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_mime_type: "application/json".to_string(),
            stack_size: DEFAULT_STACK_SIZE,
            validate_executors: true,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Load a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or is not a valid configuration document.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read runtime config {}", path.display()))?;
        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid runtime config {}", path.display()))?;
        Ok(config.with_overrides(|key| env::var(key).ok()))
    }

    /// Parse a YAML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// If the YAML is malformed or a value has the wrong type.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse runtime config YAML")
    }

    /// Apply `BRRTD_*` overrides read through `lookup`. Unparseable values are ignored.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mime) = lookup("BRRTD_DEFAULT_MIME") {
            let mime = mime.trim().to_ascii_lowercase();
            if !mime.is_empty() {
                self.default_mime_type = mime;
            }
        }
        if let Some(raw) = lookup("BRRTD_STACK_SIZE") {
            match parse_stack_size(&raw) {
                Some(size) => self.stack_size = size,
                None => warn!(value = %raw, "Ignoring invalid BRRTD_STACK_SIZE"),
            }
        }
        if let Some(raw) = lookup("BRRTD_VALIDATE_EXECUTORS") {
            match raw.trim().parse::<bool>() {
                Ok(v) => self.validate_executors = v,
                Err(_) => warn!(value = %raw, "Ignoring invalid BRRTD_VALIDATE_EXECUTORS"),
            }
        }
        self
    }

    /// Configure the `may` runtime with these settings.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
        info!(
            stack_size = self.stack_size,
            default_mime_type = %self.default_mime_type,
            validate_executors = self.validate_executors,
            "Runtime configuration applied"
        );
    }
}

/// Decimal or `0x`-prefixed hexadecimal byte count.
#[must_use]
pub fn parse_stack_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
    .filter(|size| *size > 0)
}

fn deserialize_stack_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) if n > 0 => Ok(n),
        Raw::Number(_) => Err(serde::de::Error::custom("stack_size must be positive")),
        Raw::Text(s) => parse_stack_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid stack_size '{}'", s))),
    }
}
