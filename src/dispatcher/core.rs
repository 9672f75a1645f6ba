//! Dispatcher core module - hot path for request dispatch.
//!
//! # JSF Compliance (Rule 206)
//!
//! This module is part of the request hot path. The following clippy lints
//! are denied to enforce "no heap allocations after initialization":
//!
//! - `clippy::inefficient_to_string` - Catches unnecessary allocations
//! - `clippy::format_push_string` - Prevents format! string building
//! - `clippy::unnecessary_to_owned` - Prevents .to_owned() on borrowed data

// JSF Rule 206: Deny heap allocations in the hot path
// NOTE: Error construction allocates; those paths are off the fast path
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::arguments::{RawArguments, TypedArguments};
use crate::descriptor::HandlerDescriptor;
use crate::error::{DispatchError, HandlerError};
use crate::executor::{ExecutorSet, Resumption};
use crate::ids::RequestId;
use crate::request::InboundRequest;
use crate::response::{ChannelSink, DispatchedResponse, ResponseSink};
use crate::router::RouteResolver;
use crate::runtime_config::RuntimeConfig;
use crate::serializer::{Serializer, SerializerRegistry};
use crate::service::{HandlerResult, ServiceLocator, ServiceRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// How [`Dispatcher::dispatch`] left the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No route matched; the request belongs to downstream handling and the sink was not touched
    PassThrough,
    /// The response was written (or failed) before `dispatch` returned
    Completed,
    /// A deferred handler is still running; the sink is written when it resolves
    Pending,
}

/// Per-request orchestration of resolution, binding, execution and encoding.
///
/// All collaborators are injected through [`DispatcherBuilder`] and are
/// read-only after construction, so a `Dispatcher` can be cloned cheaply and
/// shared across worker coroutines.
#[derive(Clone)]
pub struct Dispatcher {
    resolver: Arc<dyn RouteResolver>,
    executors: ExecutorSet,
    locator: Arc<dyn ServiceLocator>,
    serializers: Arc<SerializerRegistry>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.resolver.descriptors().len())
            .field("executors", &self.executors)
            .field("serializers", &self.serializers)
            .finish()
    }
}

/// Assembles a [`Dispatcher`].
///
/// Defaults: [`ExecutorSet::standard`], an empty [`ServiceRegistry`], an
/// empty [`SerializerRegistry`] and executor validation enabled.
pub struct DispatcherBuilder {
    resolver: Arc<dyn RouteResolver>,
    executors: ExecutorSet,
    locator: Arc<dyn ServiceLocator>,
    serializers: SerializerRegistry,
    validate_executors: bool,
}

impl DispatcherBuilder {
    pub fn new(resolver: Arc<dyn RouteResolver>) -> Self {
        Self {
            resolver,
            executors: ExecutorSet::standard(),
            locator: Arc::new(ServiceRegistry::new()),
            serializers: SerializerRegistry::default(),
            validate_executors: true,
        }
    }

    #[must_use]
    pub fn executors(mut self, executors: ExecutorSet) -> Self {
        self.executors = executors;
        self
    }

    #[must_use]
    pub fn locator(mut self, locator: Arc<dyn ServiceLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Convenience for a [`ServiceRegistry`] locator.
    #[must_use]
    pub fn services(self, registry: ServiceRegistry) -> Self {
        self.locator(Arc::new(registry))
    }

    #[must_use]
    pub fn serializers(mut self, serializers: SerializerRegistry) -> Self {
        self.serializers = serializers;
        self
    }

    /// Check executor coverage of every descriptor in [`build`](Self::build).
    #[must_use]
    pub fn validate_executors(mut self, validate: bool) -> Self {
        self.validate_executors = validate;
        self
    }

    /// Take the runtime settings that concern dispatch.
    #[must_use]
    pub fn config(self, config: &RuntimeConfig) -> Self {
        self.validate_executors(config.validate_executors)
    }

    /// # Errors
    ///
    /// [`DispatchError::NoExecutor`] when validation is enabled and some
    /// descriptor is not claimed by any strategy.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        let descriptors = self.resolver.descriptors();
        if self.validate_executors {
            self.executors.validate(&descriptors)?;
        }

        for d in &descriptors {
            if self.locator.get_instance(&d.declaring_type).is_none() {
                warn!(
                    declaring_type = %d.declaring_type,
                    operation = %d.operation,
                    "No service instance registered yet for route"
                );
            }
        }

        info!(
            routes = descriptors.len(),
            executors = ?self.executors.names(),
            serializers = ?self.serializers.mime_types(),
            "Dispatcher ready"
        );

        Ok(Dispatcher {
            resolver: self.resolver,
            executors: self.executors,
            locator: self.locator,
            serializers: Arc::new(self.serializers),
        })
    }
}

impl Dispatcher {
    pub fn builder(resolver: Arc<dyn RouteResolver>) -> DispatcherBuilder {
        DispatcherBuilder::new(resolver)
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn RouteResolver> {
        &self.resolver
    }

    #[must_use]
    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    /// Dispatch one request.
    ///
    /// Steps that run before the handler (routing, binding, negotiation,
    /// executor and service lookup) fail fast with `Err` and leave `sink`
    /// untouched. Once the handler is started every outcome, including an
    /// encoding or handler failure, reaches `sink` exactly once.
    ///
    /// # Errors
    ///
    /// `BindingMismatch`, `UnsupportedMediaType`, `Decode`, `AmbiguousRoute`,
    /// `NoExecutor` or `ServiceUnavailable`.
    pub fn dispatch(
        &self,
        request: &dyn InboundRequest,
        sink: Box<dyn ResponseSink>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let request_id = RequestId::from_header_or_new(
            request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        let method = request.method();

        let Some(path) = strip_context_path(request.path(), request.context_path()) else {
            // D0: Outside mount point
            debug!(
                request_id = %request_id,
                path = %request.path(),
                context_path = %request.context_path(),
                "Request outside mount point, passing through"
            );
            return Ok(DispatchOutcome::PassThrough);
        };

        // D1: Route resolution
        let descriptor = match self.resolver.resolve(method, path) {
            Ok(Some(d)) => d,
            Ok(None) => {
                debug!(request_id = %request_id, method = %method, path = %path, "Pass-through");
                return Ok(DispatchOutcome::PassThrough);
            }
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Route resolution failed - CRITICAL");
                return Err(e);
            }
        };

        // D2: Argument binding
        let raw = self.resolver.extract_arguments(&descriptor, path, request);
        if raw.len() != descriptor.parameters.len() {
            let err = DispatchError::BindingMismatch {
                operation: descriptor.qualified_name(),
                expected: descriptor.parameters.len(),
                actual: raw.len(),
            };
            warn!(request_id = %request_id, error = %err, "Argument binding failed");
            return Err(err);
        }

        // D3: Content negotiation and decoding
        let request_mime = self.resolver.request_mime_type(&descriptor, request);
        if !descriptor.accepts_request_type(&request_mime) {
            warn!(
                request_id = %request_id,
                operation = %descriptor.operation,
                mime_type = %request_mime,
                consumes = ?descriptor.consumes,
                "Request type not consumed by route"
            );
            return Err(DispatchError::UnsupportedMediaType {
                mime_type: request_mime,
            });
        }
        let decoder = self.serializer_for(request_id, &request_mime)?;
        let args = decode_arguments(&descriptor, &request_mime, decoder.as_ref(), raw)
            .inspect_err(|e| warn!(request_id = %request_id, error = %e, "Argument decoding failed"))?;

        let response_mime = self.resolver.response_mime_type(&descriptor, request);
        let encoder = self.serializer_for(request_id, &response_mime)?;
        debug!(
            request_id = %request_id,
            request_mime = %request_mime,
            response_mime = %response_mime,
            arguments = args.len(),
            "Arguments bound"
        );

        // D4: Executor and service lookup
        let Some(strategy) = self.executors.select(&descriptor) else {
            error!(
                request_id = %request_id,
                operation = %descriptor.qualified_name(),
                kind = %descriptor.kind,
                "No executor found - CRITICAL"
            );
            return Err(DispatchError::NoExecutor {
                declaring_type: descriptor.declaring_type.to_string(),
                operation: descriptor.operation.to_string(),
            });
        };
        let Some(service) = self.locator.get_instance(&descriptor.declaring_type) else {
            error!(
                request_id = %request_id,
                declaring_type = %descriptor.declaring_type,
                "Service instance not found - CRITICAL"
            );
            return Err(DispatchError::ServiceUnavailable {
                declaring_type: descriptor.declaring_type.to_string(),
            });
        };

        // D5: Execution
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            operation = %descriptor.qualified_name(),
            executor = strategy.name(),
            "Request dispatched to handler"
        );
        let started = Instant::now();
        let deferred = strategy.execute(service, &descriptor, args);

        // D6: Completion. Captures only Send data; may run on another coroutine.
        let completion = Completion {
            request_id,
            operation: Arc::clone(&descriptor.operation),
            mime_type: response_mime,
            encoder,
            started,
        };
        let resumption = deferred.on_complete(move |result| {
            let mut sink = sink;
            completion.write(result, sink.as_mut());
        });

        Ok(match resumption {
            Resumption::Inline => DispatchOutcome::Completed,
            Resumption::Scheduled => {
                debug!(request_id = %request_id, "Handler pending, returning control");
                DispatchOutcome::Pending
            }
        })
    }

    /// Dispatch and park the caller until the response is available.
    ///
    /// `Ok(None)` is a pass-through. Works from threads and coroutines.
    ///
    /// # Errors
    ///
    /// Any [`DispatchError`], whether raised before or after the handler ran.
    pub fn dispatch_and_wait(
        &self,
        request: &dyn InboundRequest,
    ) -> Result<Option<DispatchedResponse>, DispatchError> {
        let (sink, rx) = ChannelSink::channel();
        match self.dispatch(request, Box::new(sink))? {
            DispatchOutcome::PassThrough => Ok(None),
            DispatchOutcome::Completed | DispatchOutcome::Pending => match rx.recv() {
                Ok(outcome) => outcome.map(Some),
                Err(_) => Err(DispatchError::ResponseWrite {
                    message: "response sink dropped without an outcome".to_string(),
                }),
            },
        }
    }

    fn serializer_for(
        &self,
        request_id: RequestId,
        mime_type: &str,
    ) -> Result<Arc<dyn Serializer>, DispatchError> {
        self.serializers.get(mime_type).ok_or_else(|| {
            warn!(
                request_id = %request_id,
                mime_type = %mime_type,
                registered = ?self.serializers.mime_types(),
                "Serializer not found"
            );
            DispatchError::UnsupportedMediaType {
                mime_type: mime_type.to_string(),
            }
        })
    }
}

/// Everything the completion continuation needs.
struct Completion {
    request_id: RequestId,
    operation: Arc<str>,
    mime_type: String,
    encoder: Arc<dyn Serializer>,
    started: Instant,
}

impl Completion {
    fn write(self, result: HandlerResult, sink: &mut dyn ResponseSink) {
        let latency_us = self.started.elapsed().as_micros() as u64;
        let body = match self.encode(result) {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    request_id = %self.request_id,
                    operation = %self.operation,
                    latency_us = latency_us,
                    error = %err,
                    "Request failed after invocation"
                );
                sink.fail(err);
                return;
            }
        };

        sink.set_content_type(&self.mime_type);
        if let Err(e) = sink.write_body(&body) {
            error!(
                request_id = %self.request_id,
                operation = %self.operation,
                error = %e,
                "Failed to write response body"
            );
            sink.fail(DispatchError::ResponseWrite {
                message: e.to_string(),
            });
            return;
        }

        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            content_type = %self.mime_type,
            body_len = body.len(),
            latency_us = latency_us,
            "Response written"
        );
    }

    fn encode(&self, result: HandlerResult) -> Result<String, DispatchError> {
        match result {
            Ok(None) => Ok(String::new()),
            Ok(Some(value)) => self
                .encoder
                .encode(&value)
                .map_err(|e| DispatchError::Encode {
                    mime_type: self.mime_type.clone(),
                    message: e.message().to_string(),
                }),
            Err(HandlerError::Unrepresentable(message)) => Err(DispatchError::Encode {
                mime_type: self.mime_type.clone(),
                message,
            }),
            Err(HandlerError::Failed(message)) => Err(DispatchError::HandlerInvocation {
                operation: self.operation.to_string(),
                message,
            }),
        }
    }
}

/// Convert raw tokens in parameter order. The first failure aborts the request.
fn decode_arguments(
    descriptor: &HandlerDescriptor,
    mime_type: &str,
    decoder: &dyn Serializer,
    raw: RawArguments,
) -> Result<TypedArguments, DispatchError> {
    descriptor
        .parameters
        .iter()
        .zip(raw)
        .map(|(binding, token)| match token {
            None => Ok(Value::Null),
            Some(t) => decoder
                .decode(&t, binding.ty)
                .map_err(|e| DispatchError::Decode {
                    parameter: binding.name.clone(),
                    mime_type: mime_type.to_string(),
                    message: e.message().to_string(),
                }),
        })
        .collect()
}

/// Path relative to the mount point, or `None` when `path` lies outside it.
fn strip_context_path<'a>(path: &'a str, context_path: &str) -> Option<&'a str> {
    let context_path = context_path.trim_end_matches('/');
    if context_path.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(context_path)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_context_path() {
        assert_eq!(strip_context_path("/items/1", ""), Some("/items/1"));
        assert_eq!(strip_context_path("/items/1", "/"), Some("/items/1"));
        assert_eq!(strip_context_path("/api/items/1", "/api"), Some("/items/1"));
        assert_eq!(strip_context_path("/api/items/1", "/api/"), Some("/items/1"));
        assert_eq!(strip_context_path("/api", "/api"), Some("/"));
        assert_eq!(strip_context_path("/apix/items", "/api"), None);
        assert_eq!(strip_context_path("/other", "/api"), None);
    }
}
