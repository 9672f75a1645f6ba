//! # Service Module
//!
//! Handlers live on services. A [`Service`] is looked up by its declaring
//! type through a [`ServiceLocator`] and asked to run one named operation
//! with positional [`TypedArguments`]. This replaces reflective method
//! invocation: the operation name and argument order are fixed when the
//! descriptor is registered.
//!
//! Two ways to provide a service:
//!
//! - implement [`Service`] on your own type and `match` on the operation name
//! - build a [`ServiceTable`] of closures, one per operation
//!
//! ```rust
//! use brrtdispatch::service::{respond, ServiceLocator, ServiceRegistry, ServiceTable};
//!
//! let items = ServiceTable::new("ItemService")
//!     .blocking("get_item", |args| respond(&format!("item {}", args.i64(0).unwrap_or(0))));
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register("ItemService", items);
//! assert!(registry.get_instance("ItemService").is_some());
//! ```

use crate::arguments::TypedArguments;
use crate::error::HandlerError;
use crate::executor::Deferred;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// What a handler produces: a value to encode, no body, or a failure.
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// Serialize a handler's return value.
///
/// # Errors
///
/// [`HandlerError::Unrepresentable`] when `value` cannot be represented as JSON
/// (for example a map with non-string keys).
pub fn respond<T: Serialize + ?Sized>(value: &T) -> HandlerResult {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| HandlerError::Unrepresentable(e.to_string()))
}

fn unsupported(operation: &str) -> HandlerError {
    HandlerError::failed(format!("operation '{}' is not supported", operation))
}

/// A live handler instance.
///
/// Implementations must be safe to call concurrently; the dispatcher neither
/// pools nor serializes invocations.
pub trait Service: Send + Sync {
    /// Run a blocking operation on the caller's context.
    fn invoke(&self, operation: &str, args: TypedArguments) -> HandlerResult {
        let _ = args;
        Err(unsupported(operation))
    }

    /// Start a deferred operation and return its pending result.
    fn invoke_deferred(&self, operation: &str, args: TypedArguments) -> Deferred {
        let _ = args;
        Deferred::ready(Err(unsupported(operation)))
    }
}

/// Provides ready-to-invoke service instances by declaring type.
pub trait ServiceLocator: Send + Sync {
    fn get_instance(&self, declaring_type: &str) -> Option<Arc<dyn Service>>;
}

/// Map-backed [`ServiceLocator`], filled at startup.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn Service>>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its declaring type, replacing any previous one.
    pub fn register<S: Service + 'static>(&mut self, declaring_type: &str, service: S) {
        self.register_arc(declaring_type, Arc::new(service));
    }

    pub fn register_arc(&mut self, declaring_type: &str, service: Arc<dyn Service>) {
        if self
            .services
            .insert(declaring_type.to_string(), service)
            .is_some()
        {
            warn!(declaring_type = %declaring_type, "Replaced existing service instance");
        } else {
            info!(
                declaring_type = %declaring_type,
                total_services = self.services.len(),
                "Service registered"
            );
        }
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<S: Service + 'static>(mut self, declaring_type: &str, service: S) -> Self {
        self.register(declaring_type, service);
        self
    }

    #[must_use]
    pub fn contains(&self, declaring_type: &str) -> bool {
        self.services.contains_key(declaring_type)
    }

    /// Registered declaring types, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLocator for ServiceRegistry {
    fn get_instance(&self, declaring_type: &str) -> Option<Arc<dyn Service>> {
        self.services.get(declaring_type).cloned()
    }
}

type BlockingOp = Arc<dyn Fn(TypedArguments) -> HandlerResult + Send + Sync>;
type DeferredOp = Arc<dyn Fn(TypedArguments) -> Deferred + Send + Sync>;

/// A [`Service`] assembled from closures keyed by operation name.
#[derive(Clone)]
pub struct ServiceTable {
    name: String,
    blocking: HashMap<String, BlockingOp>,
    deferred: HashMap<String, DeferredOp>,
}

impl std::fmt::Debug for ServiceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut blocking: Vec<&String> = self.blocking.keys().collect();
        blocking.sort();
        let mut deferred: Vec<&String> = self.deferred.keys().collect();
        deferred.sort();
        f.debug_struct("ServiceTable")
            .field("name", &self.name)
            .field("blocking", &blocking)
            .field("deferred", &deferred)
            .finish()
    }
}

impl ServiceTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocking: HashMap::new(),
            deferred: HashMap::new(),
        }
    }

    #[must_use]
    pub fn blocking<F>(mut self, operation: &str, f: F) -> Self
    where
        F: Fn(TypedArguments) -> HandlerResult + Send + Sync + 'static,
    {
        self.blocking.insert(operation.to_string(), Arc::new(f));
        self
    }

    #[must_use]
    pub fn deferred<F>(mut self, operation: &str, f: F) -> Self
    where
        F: Fn(TypedArguments) -> Deferred + Send + Sync + 'static,
    {
        self.deferred.insert(operation.to_string(), Arc::new(f));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Service for ServiceTable {
    fn invoke(&self, operation: &str, args: TypedArguments) -> HandlerResult {
        match self.blocking.get(operation) {
            Some(op) => op(args),
            None => Err(unsupported(operation)),
        }
    }

    fn invoke_deferred(&self, operation: &str, args: TypedArguments) -> Deferred {
        match self.deferred.get(operation) {
            Some(op) => op(args),
            None => Deferred::ready(Err(unsupported(operation))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    struct Echo;

    impl Service for Echo {
        fn invoke(&self, operation: &str, args: TypedArguments) -> HandlerResult {
            match operation {
                "echo" => Ok(args.value(0).cloned()),
                other => Err(unsupported(other)),
            }
        }
    }

    #[test]
    fn test_default_deferred_is_unsupported() {
        let result = Echo.invoke_deferred("echo", TypedArguments::new()).wait();
        assert_eq!(
            result,
            Err(HandlerError::Failed("operation 'echo' is not supported".into()))
        );
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ServiceRegistry::new().with("Echo", Echo);
        let svc = registry.get_instance("Echo").expect("service");
        let args: TypedArguments = vec![json!("x")].into_iter().collect();
        assert_eq!(svc.invoke("echo", args), Ok(Some(json!("x"))));
        assert!(registry.get_instance("Missing").is_none());
        assert_eq!(registry.names(), vec!["Echo"]);
    }

    #[test]
    fn test_service_table_dispatches_by_operation() {
        let table = ServiceTable::new("Math")
            .blocking("double", |args| respond(&(args.i64(0).unwrap_or(0) * 2)))
            .deferred("later", |_| Deferred::ready(Ok(None)));
        let args: TypedArguments = vec![json!(21)].into_iter().collect();
        assert_eq!(table.invoke("double", args), Ok(Some(json!(42))));
        assert!(table.invoke("later", TypedArguments::new()).is_err());
        assert_eq!(
            table.invoke_deferred("later", TypedArguments::new()).wait(),
            Ok(None)
        );
    }

    #[test]
    fn test_respond_unrepresentable() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "tuple keys");
        assert!(matches!(respond(&map), Err(HandlerError::Unrepresentable(_))));
    }
}
