//! # Serializer Module
//!
//! A [`SerializerRegistry`] maps a MIME type to a bidirectional converter
//! between wire text and [`serde_json::Value`]. The registry is built once at
//! startup and is read-only afterwards, so it is shared as an `Arc` and read
//! concurrently without locking.
//!
//! The core registers nothing by itself. Hosts pick plug-ins explicitly:
//!
//! ```rust
//! use brrtdispatch::serializer::{JsonSerializer, PlainTextSerializer, SerializerRegistry};
//!
//! let registry = SerializerRegistry::builder()
//!     .register("application/json", JsonSerializer)
//!     .register("text/plain", PlainTextSerializer)
//!     .build();
//! assert!(registry.get("Application/JSON").is_some());
//! assert!(registry.get("application/xml").is_none());
//! ```

mod json;
mod text;
mod yaml;

pub use json::JsonSerializer;
pub use text::PlainTextSerializer;
pub use yaml::YamlSerializer;

use crate::descriptor::ParamType;
use crate::error::SerializerError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Converter registered under one MIME type.
pub trait Serializer: Send + Sync {
    /// Convert one raw token to a value of the requested type.
    ///
    /// # Errors
    ///
    /// [`SerializerError::Decode`] when the text is malformed for `target`.
    fn decode(&self, raw: &str, target: ParamType) -> Result<Value, SerializerError>;

    /// Render a handler result.
    ///
    /// # Errors
    ///
    /// [`SerializerError::Encode`] when the value has no representation in this format.
    fn encode(&self, value: &Value) -> Result<String, SerializerError>;
}

/// Immutable MIME type -> serializer map.
#[derive(Clone, Default)]
pub struct SerializerRegistry {
    serializers: HashMap<String, Arc<dyn Serializer>>,
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("mime_types", &self.mime_types())
            .finish()
    }
}

impl SerializerRegistry {
    #[must_use]
    pub fn builder() -> SerializerRegistryBuilder {
        SerializerRegistryBuilder::default()
    }

    /// Look up the serializer for a MIME type (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get(&self, mime_type: &str) -> Option<Arc<dyn Serializer>> {
        self.serializers
            .get(&mime_type.trim().to_ascii_lowercase())
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, mime_type: &str) -> bool {
        self.get(mime_type).is_some()
    }

    /// Registered MIME types, sorted.
    #[must_use]
    pub fn mime_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.serializers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }
}

/// Collects registrations; the last registration for a key wins.
#[derive(Default)]
pub struct SerializerRegistryBuilder {
    serializers: HashMap<String, Arc<dyn Serializer>>,
}

impl SerializerRegistryBuilder {
    #[must_use]
    pub fn register<S: Serializer + 'static>(self, mime_type: &str, serializer: S) -> Self {
        self.register_arc(mime_type, Arc::new(serializer))
    }

    /// Register an already shared serializer.
    #[must_use]
    pub fn register_arc(mut self, mime_type: &str, serializer: Arc<dyn Serializer>) -> Self {
        let key = mime_type.trim().to_ascii_lowercase();
        if self.serializers.insert(key.clone(), serializer).is_some() {
            warn!(mime_type = %key, "Replaced existing serializer registration");
        }
        self
    }

    #[must_use]
    pub fn build(self) -> SerializerRegistry {
        let registry = SerializerRegistry {
            serializers: self.serializers,
        };
        info!(
            serializers = ?registry.mime_types(),
            "Serializer registry built"
        );
        registry
    }
}
