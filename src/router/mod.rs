//! # Router Module
//!
//! The router module is the route resolver of the dispatch pipeline. It
//! matches an inbound `(method, path)` to exactly one registered
//! [`HandlerDescriptor`](crate::descriptor::HandlerDescriptor), extracts the
//! raw argument tokens from path variables, query parameters, headers and
//! body, and negotiates the request and response MIME types.
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: At registration, templates (e.g., `/items/{id}`) are
//!    converted into anchored regex patterns with ordered variable names
//!    ([`PathTemplate`]). Duplicate `(method, template shape)` pairs are rejected.
//!
//! 2. **Matching**: For each incoming request, the router tests the path
//!    against the compiled patterns for the method. Zero matches is a
//!    pass-through, one match is returned, and two or more matches are a
//!    configuration error ([`DispatchError::AmbiguousRoute`](crate::DispatchError::AmbiguousRoute)).
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::descriptor::{HandlerDescriptor, ParamBinding, ParamType};
//! use brrtdispatch::router::{RouteResolver, Router};
//! use http::Method;
//!
//! let get_item = HandlerDescriptor::builder(Method::GET, "/items/{id}", "ItemService", "get_item")
//!     .param(ParamBinding::path("id", ParamType::Integer))
//!     .build()
//!     .unwrap();
//! let router = Router::new(vec![get_item], "application/json").unwrap();
//!
//! let matched = router.resolve(&Method::GET, "/items/42").unwrap();
//! assert_eq!(&*matched.unwrap().operation, "get_item");
//! assert!(router.resolve(&Method::GET, "/other").unwrap().is_none());
//! ```
//!
//! ## MIME negotiation
//!
//! - Request: `Content-Type` essence, else the descriptor's first `consumes`
//!   entry, else the router default.
//! - Response: the `Accept` header (q-values and wildcards) picks among the
//!   descriptor's `produces` list, or the default when that list is empty.

mod core;
pub mod negotiate;
mod template;

pub use self::core::{RouteResolver, Router};
pub use template::{ParamVec, PathTemplate, MAX_INLINE_PARAMS};
