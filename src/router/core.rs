//! Router core module - hot path for request routing.
//!
//! # JSF Compliance (Rule 206)
//!
//! This module is part of the request hot path. The following clippy lints
//! are denied to enforce "no heap allocations after initialization":
//!
//! - `clippy::inefficient_to_string` - Catches unnecessary allocations
//! - `clippy::format_push_string` - Prevents format! string building

// JSF Rule 206: Deny heap allocations in the hot path
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use super::negotiate::{media_type_essence, negotiate};
use crate::arguments::RawArguments;
use crate::descriptor::{ConventionProvider, HandlerDescriptor, ParamSource};
use crate::error::DispatchError;
use crate::request::InboundRequest;
use crate::runtime_config::RuntimeConfig;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::Method;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maps `(method, path)` to a descriptor and pulls raw arguments out of a request.
///
/// The matching scheme is up to the implementation; the dispatcher only
/// relies on this contract.
pub trait RouteResolver: Send + Sync {
    /// Find the single descriptor matching `method path`.
    ///
    /// `Ok(None)` means the request is not ours (pass-through).
    ///
    /// # Errors
    ///
    /// [`DispatchError::AmbiguousRoute`] when more than one descriptor matches.
    fn resolve(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<Option<Arc<HandlerDescriptor>>, DispatchError>;

    /// One token per parameter, in parameter order.
    ///
    /// A required parameter with no source value yields no token at all so
    /// the caller's length check reports a binding mismatch.
    fn extract_arguments(
        &self,
        descriptor: &HandlerDescriptor,
        path: &str,
        request: &dyn InboundRequest,
    ) -> RawArguments;

    /// MIME type used to convert the raw arguments.
    fn request_mime_type(&self, descriptor: &HandlerDescriptor, request: &dyn InboundRequest)
        -> String;

    /// MIME type used to encode the handler result.
    fn response_mime_type(
        &self,
        descriptor: &HandlerDescriptor,
        request: &dyn InboundRequest,
    ) -> String;

    /// Every registered descriptor, used for startup validation.
    fn descriptors(&self) -> Vec<Arc<HandlerDescriptor>>;
}

/// Template-matching [`RouteResolver`].
///
/// Each descriptor's template is compiled to an anchored regex at
/// registration. Resolution tests every route registered for the method and
/// refuses to pick between two matches.
///
/// # Performance
///
/// - Route matching: O(n) where n is the number of routes for the method
/// - Descriptors are shared as `Arc<HandlerDescriptor>`; resolving never clones one
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Arc<HandlerDescriptor>>,
    default_mime_type: String,
}

impl Router {
    /// Create a router from descriptors.
    ///
    /// # Errors
    ///
    /// [`DispatchError::DuplicateRoute`] when two descriptors share a method
    /// and template shape (`/items/{id}` and `/items/{key}` are the same shape).
    pub fn new(
        descriptors: Vec<HandlerDescriptor>,
        default_mime_type: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        let mut seen: HashSet<(Method, String)> = HashSet::with_capacity(descriptors.len());
        for d in &descriptors {
            if !seen.insert((d.method.clone(), d.template.shape().to_string())) {
                return Err(DispatchError::DuplicateRoute {
                    method: d.method.to_string(),
                    template: d.template.as_str().to_string(),
                });
            }
        }

        let routes: Vec<Arc<HandlerDescriptor>> = descriptors.into_iter().map(Arc::new).collect();
        let default_mime_type = default_mime_type.into().to_ascii_lowercase();

        // RT5: Routing table loaded
        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|d| format!("{} {}", d.method, d.template.as_str()))
            .collect();
        info!(
            routes_count = routes.len(),
            default_mime_type = %default_mime_type,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Ok(Self {
            routes,
            default_mime_type,
        })
    }

    /// Create a router whose negotiation fallback is `config.default_mime_type`.
    ///
    /// # Errors
    ///
    /// Same as [`Router::new`].
    pub fn from_config(
        descriptors: Vec<HandlerDescriptor>,
        config: &RuntimeConfig,
    ) -> Result<Self, DispatchError> {
        Self::new(descriptors, config.default_mime_type.as_str())
    }

    /// Build a router from whatever a convention provider supplies.
    pub fn from_convention(
        provider: &dyn ConventionProvider,
        config: &RuntimeConfig,
    ) -> anyhow::Result<Self> {
        let descriptors = provider.descriptors()?;
        Ok(Self::from_config(descriptors, config)?)
    }

    #[must_use]
    pub fn default_mime_type(&self) -> &str {
        &self.default_mime_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `METHOD /template -> Type::operation` for every route.
    #[must_use]
    pub fn route_summaries(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|d| {
                format!(
                    "{} {} -> {}",
                    d.method,
                    d.template.as_str(),
                    d.qualified_name()
                )
            })
            .collect()
    }
}

impl RouteResolver for Router {
    fn resolve(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<Option<Arc<HandlerDescriptor>>, DispatchError> {
        // RT1: Route match attempt
        debug!(method = %method, path = %path, "Route match attempt");

        let match_start = Instant::now();
        let mut matched = self
            .routes
            .iter()
            .filter(|d| d.method == *method && d.template.is_match(path));

        let first = matched.next();
        let second = matched.next();
        let match_duration = match_start.elapsed();

        match (first, second) {
            (Some(a), Some(b)) => {
                // RT2: Ambiguous configuration
                let mut candidates = vec![a.qualified_name(), b.qualified_name()];
                candidates.extend(matched.map(|d| d.qualified_name()));
                warn!(
                    method = %method,
                    path = %path,
                    candidates = ?candidates,
                    "Ambiguous route match"
                );
                Err(DispatchError::AmbiguousRoute {
                    method: method.to_string(),
                    path: path.to_string(),
                    candidates,
                })
            }
            (Some(d), None) => {
                // RT3: Route matched
                if match_duration > Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        route_pattern = %d.template.as_str(),
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        route_pattern = %d.template.as_str(),
                        operation = %d.operation,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                Ok(Some(Arc::clone(d)))
            }
            _ => {
                // RT4: No route found (pass-through)
                debug!(method = %method, path = %path, "No route matched");
                Ok(None)
            }
        }
    }

    fn extract_arguments(
        &self,
        descriptor: &HandlerDescriptor,
        path: &str,
        request: &dyn InboundRequest,
    ) -> RawArguments {
        let path_params = descriptor.template.captures(path).unwrap_or_default();
        let mut raw = RawArguments::new();

        for binding in &descriptor.parameters {
            let token = match binding.source {
                // Last occurrence wins, matching query semantics
                ParamSource::Path => path_params
                    .iter()
                    .rfind(|(k, _)| k.as_ref() == binding.name.as_str())
                    .map(|(_, v)| v.clone()),
                ParamSource::Query => request
                    .query_params()
                    .iter()
                    .rfind(|(k, _)| *k == binding.name)
                    .map(|(_, v)| v.clone()),
                ParamSource::Header => request
                    .headers()
                    .get(binding.name.as_str())
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                ParamSource::Body => {
                    let body = request.body();
                    (!body.trim().is_empty()).then(|| body.to_string())
                }
            };

            match token {
                Some(t) => raw.push(Some(t)),
                None if binding.required => {
                    debug!(
                        operation = %descriptor.operation,
                        parameter = %binding.name,
                        source = %binding.source,
                        "Required parameter missing"
                    );
                }
                None => raw.push(None),
            }
        }
        raw
    }

    fn request_mime_type(
        &self,
        descriptor: &HandlerDescriptor,
        request: &dyn InboundRequest,
    ) -> String {
        request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(media_type_essence)
            .or_else(|| descriptor.consumes.first().cloned())
            .unwrap_or_else(|| self.default_mime_type.clone())
    }

    fn response_mime_type(
        &self,
        descriptor: &HandlerDescriptor,
        request: &dyn InboundRequest,
    ) -> String {
        let defaults;
        let candidates: &[String] = if descriptor.produces.is_empty() {
            defaults = [self.default_mime_type.clone()];
            &defaults
        } else {
            &descriptor.produces
        };

        let accept: Vec<&str> = request
            .headers()
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        let fallback = || candidates.first().cloned().unwrap_or_default();
        if accept.is_empty() {
            return fallback();
        }

        match negotiate(&accept.join(","), candidates) {
            Some(mime) => mime.to_string(),
            None => {
                debug!(
                    operation = %descriptor.operation,
                    accept = ?accept,
                    "No acceptable response type, using first candidate"
                );
                fallback()
            }
        }
    }

    fn descriptors(&self) -> Vec<Arc<HandlerDescriptor>> {
        self.routes.clone()
    }
}
