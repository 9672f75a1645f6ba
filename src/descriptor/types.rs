use crate::error::DispatchError;
use crate::router::PathTemplate;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// Where a parameter's raw token comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Path,
    Query,
    Header,
    Body,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSource::Path => write!(f, "Path"),
            ParamSource::Query => write!(f, "Query"),
            ParamSource::Header => write!(f, "Header"),
            ParamSource::Body => write!(f, "Body"),
        }
    }
}

/// Target type of a parameter, chosen at registration so conversion is a table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// Any structured document (object, array or scalar)
    Json,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::String => "String",
            ParamType::Integer => "Integer",
            ParamType::Number => "Number",
            ParamType::Boolean => "Boolean",
            ParamType::Json => "Json",
        };
        write!(f, "{}", s)
    }
}

/// Return shape of a handler, which decides the execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Returns a plain value (or nothing) on the calling context
    Blocking,
    /// Returns a [`Deferred`](crate::executor::Deferred) resolved later
    Deferred,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Blocking => write!(f, "Blocking"),
            HandlerKind::Deferred => write!(f, "Deferred"),
        }
    }
}

/// Binding metadata for one positional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub name: String,
    pub source: ParamSource,
    pub ty: ParamType,
    pub required: bool,
}

impl ParamBinding {
    /// Required path variable.
    pub fn path(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ParamSource::Path, ty, true)
    }

    /// Optional query parameter.
    pub fn query(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ParamSource::Query, ty, false)
    }

    /// Optional header.
    pub fn header(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ParamSource::Header, ty, false)
    }

    /// Required request body.
    pub fn body(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ParamSource::Body, ty, true)
    }

    pub fn new(name: impl Into<String>, source: ParamSource, ty: ParamType, required: bool) -> Self {
        Self {
            name: name.into(),
            source,
            ty,
            required,
        }
    }

    /// Mark the binding required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the binding optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// One invokable operation: immutable once registered.
///
/// Created at startup by a [`ConventionProvider`](super::ConventionProvider)
/// and shared behind an `Arc` for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    /// Key passed to the service locator
    pub declaring_type: Arc<str>,
    /// Operation invoked on the located service
    pub operation: Arc<str>,
    pub method: Method,
    pub template: PathTemplate,
    /// Ordered, positional parameters
    pub parameters: Vec<ParamBinding>,
    /// MIME types this operation can respond with, in preference order
    pub produces: Vec<String>,
    /// MIME types this operation accepts, in preference order
    pub consumes: Vec<String>,
    pub kind: HandlerKind,
}

impl HandlerDescriptor {
    /// Start building a descriptor for `declaring_type::operation` at `method template`.
    pub fn builder(
        method: Method,
        template: impl Into<String>,
        declaring_type: impl Into<String>,
        operation: impl Into<String>,
    ) -> HandlerDescriptorBuilder {
        HandlerDescriptorBuilder {
            method,
            template: template.into(),
            declaring_type: declaring_type.into(),
            operation: operation.into(),
            parameters: Vec::new(),
            produces: Vec::new(),
            consumes: Vec::new(),
            kind: HandlerKind::Blocking,
        }
    }

    /// `Type::operation`, used in logs and errors.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.declaring_type, self.operation)
    }

    /// Whether a request body of this MIME type is accepted.
    ///
    /// An empty `consumes` list accepts anything.
    #[must_use]
    pub fn accepts_request_type(&self, mime_type: &str) -> bool {
        self.consumes.is_empty()
            || self
                .consumes
                .iter()
                .any(|c| c.eq_ignore_ascii_case(mime_type))
    }
}

/// Builder for [`HandlerDescriptor`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct HandlerDescriptorBuilder {
    method: Method,
    template: String,
    declaring_type: String,
    operation: String,
    parameters: Vec<ParamBinding>,
    produces: Vec<String>,
    consumes: Vec<String>,
    kind: HandlerKind,
}

impl HandlerDescriptorBuilder {
    #[must_use]
    pub fn param(mut self, binding: ParamBinding) -> Self {
        self.parameters.push(binding);
        self
    }

    #[must_use]
    pub fn produces(mut self, mime_type: impl Into<String>) -> Self {
        self.produces.push(mime_type.into().to_ascii_lowercase());
        self
    }

    #[must_use]
    pub fn consumes(mut self, mime_type: impl Into<String>) -> Self {
        self.consumes.push(mime_type.into().to_ascii_lowercase());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: HandlerKind) -> Self {
        self.kind = kind;
        self
    }

    /// Shorthand for `kind(HandlerKind::Deferred)`.
    #[must_use]
    pub fn deferred(self) -> Self {
        self.kind(HandlerKind::Deferred)
    }

    /// Compile the template and validate the bindings.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidDescriptor`] when the template is malformed, the
    /// declaring type or operation is empty, a path binding names no template
    /// variable, or more than one body binding is declared.
    pub fn build(self) -> Result<HandlerDescriptor, DispatchError> {
        let template = PathTemplate::parse(&self.template)?;
        let invalid = |reason: String| DispatchError::InvalidDescriptor {
            template: self.template.clone(),
            reason,
        };

        if self.declaring_type.trim().is_empty() {
            return Err(invalid("declaring type must not be empty".into()));
        }
        if self.operation.trim().is_empty() {
            return Err(invalid("operation must not be empty".into()));
        }

        for binding in &self.parameters {
            if binding.source == ParamSource::Path && !template.has_variable(&binding.name) {
                return Err(invalid(format!(
                    "path parameter '{}' is not a template variable",
                    binding.name
                )));
            }
        }

        let body_count = self
            .parameters
            .iter()
            .filter(|b| b.source == ParamSource::Body)
            .count();
        if body_count > 1 {
            return Err(invalid(format!(
                "at most one body parameter is allowed, found {}",
                body_count
            )));
        }

        Ok(HandlerDescriptor {
            declaring_type: Arc::from(self.declaring_type.as_str()),
            operation: Arc::from(self.operation.as_str()),
            method: self.method,
            template,
            parameters: self.parameters,
            produces: self.produces,
            consumes: self.consumes,
            kind: self.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_descriptor() {
        let d = HandlerDescriptor::builder(Method::GET, "/items/{id}", "ItemService", "get_item")
            .param(ParamBinding::path("id", ParamType::Integer))
            .param(ParamBinding::query("verbose", ParamType::Boolean))
            .produces("Text/Plain")
            .build()
            .expect("descriptor");
        assert_eq!(d.qualified_name(), "ItemService::get_item");
        assert_eq!(d.parameters.len(), 2);
        assert_eq!(d.produces, vec!["text/plain"]);
        assert_eq!(d.kind, HandlerKind::Blocking);
        assert!(d.accepts_request_type("application/json"));
    }

    #[test]
    fn test_path_binding_must_exist_in_template() {
        let err = HandlerDescriptor::builder(Method::GET, "/items/{id}", "ItemService", "get_item")
            .param(ParamBinding::path("item_id", ParamType::Integer))
            .build()
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_single_body_binding() {
        let err = HandlerDescriptor::builder(Method::POST, "/items", "ItemService", "create")
            .param(ParamBinding::body("a", ParamType::Json))
            .param(ParamBinding::body("b", ParamType::Json))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("at most one body parameter"));
    }

    #[test]
    fn test_consumes_restricts_request_type() {
        let d = HandlerDescriptor::builder(Method::POST, "/items", "ItemService", "create")
            .consumes("application/json")
            .deferred()
            .build()
            .expect("descriptor");
        assert!(d.accepts_request_type("APPLICATION/JSON"));
        assert!(!d.accepts_request_type("text/plain"));
        assert_eq!(d.kind, HandlerKind::Deferred);
    }

    #[test]
    fn test_empty_operation_rejected() {
        assert!(HandlerDescriptor::builder(Method::GET, "/", "Svc", " ")
            .build()
            .is_err());
    }
}
