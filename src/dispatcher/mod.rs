//! # Dispatcher Module
//!
//! The dispatcher is the per-request orchestration core. It owns no
//! transport: a host hands it an [`InboundRequest`] and a [`ResponseSink`]
//! and gets back a [`DispatchOutcome`].
//!
//! ## Request Flow
//!
//! 1. Strip the mount point and resolve `(method, path)` to a descriptor;
//!    no match is a pass-through
//! 2. Extract raw arguments and check there is one per declared parameter
//! 3. Negotiate request and response MIME types, look up both serializers,
//!    decode every argument
//! 4. Select the first execution strategy that accepts the descriptor and
//!    locate the service instance
//! 5. Execute; control returns to the caller immediately for deferred handlers
//! 6. On completion encode the result and write it to the sink
//!
//! Steps 1-4 fail fast with `Err` before any handler runs. Failures in
//! steps 5-6 reach the sink through [`ResponseSink::fail`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtdispatch::descriptor::{HandlerDescriptor, ParamBinding, ParamType};
//! use brrtdispatch::dispatcher::Dispatcher;
//! use brrtdispatch::request::DispatchRequest;
//! use brrtdispatch::router::Router;
//! use brrtdispatch::serializer::{JsonSerializer, SerializerRegistry};
//! use brrtdispatch::service::{respond, ServiceRegistry, ServiceTable};
//! use http::Method;
//!
//! let get_item = HandlerDescriptor::builder(Method::GET, "/items/{id}", "ItemService", "get_item")
//!     .param(ParamBinding::path("id", ParamType::Integer))
//!     .build()
//!     .unwrap();
//! let router = Router::new(vec![get_item], "application/json").unwrap();
//!
//! let services = ServiceRegistry::new().with(
//!     "ItemService",
//!     ServiceTable::new("ItemService")
//!         .blocking("get_item", |args| respond(&format!("item {}", args.i64(0).unwrap_or(0)))),
//! );
//!
//! let dispatcher = Dispatcher::builder(Arc::new(router))
//!     .services(services)
//!     .serializers(SerializerRegistry::builder().register("application/json", JsonSerializer).build())
//!     .build()
//!     .unwrap();
//!
//! let response = dispatcher
//!     .dispatch_and_wait(&DispatchRequest::new(Method::GET, "/items/42"))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(response.body, "\"item 42\"");
//! assert_eq!(response.content_type, "application/json");
//! ```

mod core;

pub use self::core::{Dispatcher, DispatcherBuilder, DispatchOutcome, REQUEST_ID_HEADER};
pub use crate::request::InboundRequest;
pub use crate::response::ResponseSink;
