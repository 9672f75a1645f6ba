//! # brrtdispatch
//!
//! **brrtdispatch** is a reflection-free request dispatch core. It maps an
//! inbound HTTP-style request onto a registered service operation, converts
//! raw path, query, header and body tokens into typed arguments through a
//! MIME-keyed serializer registry, runs the operation under a blocking or
//! deferred execution strategy, and writes the encoded result to a response
//! sink.
//!
//! It owns no transport. A host adapts its own request type to
//! [`InboundRequest`] (or builds a [`DispatchRequest`]) and hands the
//! dispatcher a [`ResponseSink`].
//!
//! ## Architecture
//!
//! - **[`descriptor`]** - `HandlerDescriptor` metadata, fixed at registration, and convention providers
//! - **[`router`]** - `RouteResolver` trait, template router, MIME negotiation
//! - **[`serializer`]** - MIME-keyed serializer registry and plug-ins
//! - **[`executor`]** - blocking and deferred execution strategies, `Deferred` completion
//! - **[`service`]** - `Service` invocation seam and `ServiceLocator`
//! - **[`dispatcher`]** - per-request orchestration
//! - **[`request`]** / **[`response`]** - boundary adapters
//! - **[`runtime_config`]** / **[`logging`]** - configuration and structured logging
//!
//! ## Request Lifecycle
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Dispatcher
//!     participant Router
//!     participant Serializers
//!     participant Executor
//!     participant Service
//!     participant Sink
//!
//!     Host->>Dispatcher: dispatch(request, sink)
//!     Dispatcher->>Router: resolve(method, path)
//!     Router-->>Dispatcher: descriptor | none (pass-through)
//!     Dispatcher->>Router: extract_arguments / negotiate MIME types
//!     Dispatcher->>Serializers: decode each raw argument
//!     Dispatcher->>Executor: select(descriptor).execute(service, args)
//!     Executor->>Service: invoke / invoke_deferred
//!     Executor-->>Dispatcher: Deferred
//!     Dispatcher-->>Host: Completed | Pending
//!     Service-->>Dispatcher: result (on completion)
//!     Dispatcher->>Serializers: encode result
//!     Dispatcher->>Sink: set_content_type + write_body | fail
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtdispatch::{
//!     Dispatcher, HandlerDescriptor, JsonSerializer, ParamBinding, ParamType, Router,
//!     SerializerRegistry, ServiceRegistry, ServiceTable, DispatchRequest,
//! };
//! use brrtdispatch::service::respond;
//! use http::Method;
//!
//! let routes = vec![HandlerDescriptor::builder(Method::GET, "/hello/{name}", "Greeter", "hello")
//!     .param(ParamBinding::path("name", ParamType::String))
//!     .build()
//!     .unwrap()];
//!
//! let dispatcher = Dispatcher::builder(Arc::new(Router::new(routes, "application/json").unwrap()))
//!     .serializers(SerializerRegistry::builder().register("application/json", JsonSerializer).build())
//!     .services(ServiceRegistry::new().with(
//!         "Greeter",
//!         ServiceTable::new("Greeter")
//!             .blocking("hello", |args| respond(&format!("hello {}", args.str(0).unwrap_or("?")))),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let resp = dispatcher
//!     .dispatch_and_wait(&DispatchRequest::new(Method::GET, "/hello/world"))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(resp.body, "\"hello world\"");
//! ```

pub mod arguments;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod ids;
pub mod logging;
pub mod request;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod serializer;
pub mod service;

pub use arguments::{RawArguments, TypedArguments};
pub use descriptor::{
    load_route_table, ConventionProvider, HandlerDescriptor, HandlerKind, ParamBinding,
    ParamSource, ParamType, RouteTable,
};
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, ErrorKind, HandlerError, SerializerError};
pub use executor::{
    BlockingStrategy, Completer, Deferred, DeferredStrategy, ExecutionStrategy, ExecutorSet,
};
pub use ids::RequestId;
pub use request::{DispatchRequest, InboundRequest};
pub use response::{BufferedResponse, ChannelSink, DispatchedResponse, ResponseSink};
pub use router::{RouteResolver, Router};
pub use runtime_config::RuntimeConfig;
pub use serializer::{
    JsonSerializer, PlainTextSerializer, Serializer, SerializerRegistry, YamlSerializer,
};
pub use service::{HandlerResult, Service, ServiceLocator, ServiceRegistry, ServiceTable};
