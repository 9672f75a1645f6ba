//! # Descriptor Module
//!
//! Handler descriptors are the registered metadata for every invokable
//! operation: the declaring type used for service lookup, the operation
//! name, the HTTP method and path template, the ordered parameter bindings
//! with their type tags, the produced/consumed MIME types and the
//! [`HandlerKind`] that decides which execution strategy runs it.
//!
//! Descriptors are produced once at startup by a [`ConventionProvider`],
//! either an explicit `Vec<HandlerDescriptor>` or a declarative
//! [`RouteTable`] loaded from YAML/JSON, and are never mutated afterwards.

mod load;
mod types;

pub use load::{load_route_table, ConventionProvider, RouteTable};
pub use types::{
    HandlerDescriptor, HandlerDescriptorBuilder, HandlerKind, ParamBinding, ParamSource, ParamType,
};
