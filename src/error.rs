//! Error types produced by the dispatch pipeline.
//!
//! The dispatcher never chooses a wire status code. It produces a
//! [`DispatchError`] describing the cause, and the hosting transport maps
//! [`DispatchError::kind`] (or the coarser [`DispatchError::is_client_error`])
//! to whatever its protocol uses.

use std::fmt;

/// Coarse classification of a [`DispatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request is malformed: argument count does not match the parameters
    BindingMismatch,
    /// No serializer for the negotiated MIME type, or the descriptor does not consume it
    UnsupportedMediaType,
    /// A raw argument could not be converted to its declared type
    Decode,
    /// The handler result could not be encoded for the negotiated response type
    Encode,
    /// The handler itself failed
    HandlerInvocation,
    /// No execution strategy accepts the descriptor
    NoExecutor,
    /// The service locator has no instance for the declaring type
    ServiceUnavailable,
    /// Route table problems: ambiguous, duplicate or invalid descriptors
    Configuration,
    /// The response sink rejected the body
    ResponseWrite,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::BindingMismatch => "BindingMismatch",
            ErrorKind::UnsupportedMediaType => "UnsupportedMediaType",
            ErrorKind::Decode => "Decode",
            ErrorKind::Encode => "Encode",
            ErrorKind::HandlerInvocation => "HandlerInvocation",
            ErrorKind::NoExecutor => "NoExecutor",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
            ErrorKind::Configuration => "Configuration",
            ErrorKind::ResponseWrite => "ResponseWrite",
        };
        write!(f, "{}", s)
    }
}

/// Terminal failure of a single dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Extraction yielded a different number of tokens than declared parameters
    BindingMismatch {
        /// Operation the request was bound to
        operation: String,
        /// Number of declared parameters
        expected: usize,
        /// Number of extracted tokens
        actual: usize,
    },
    /// No serializer is registered for the MIME type, or the route does not consume it
    UnsupportedMediaType {
        /// The negotiated MIME type
        mime_type: String,
    },
    /// A single raw token failed conversion; the whole request is aborted
    Decode {
        /// Name of the parameter being converted
        parameter: String,
        /// MIME type of the serializer used
        mime_type: String,
        /// Serializer message
        message: String,
    },
    /// The handler result is not representable in the negotiated MIME type
    Encode {
        /// MIME type of the response serializer
        mime_type: String,
        /// Serializer message
        message: String,
    },
    /// The handler reported a failure or panicked
    HandlerInvocation {
        /// Operation that failed
        operation: String,
        /// Failure message
        message: String,
    },
    /// No registered execution strategy claims the descriptor
    NoExecutor {
        /// Declaring type of the unclaimed descriptor
        declaring_type: String,
        /// Operation of the unclaimed descriptor
        operation: String,
    },
    /// The service locator could not provide an instance
    ServiceUnavailable {
        /// Declaring type that failed to resolve
        declaring_type: String,
    },
    /// More than one descriptor matches the same method and path
    AmbiguousRoute {
        /// HTTP method of the request
        method: String,
        /// Request path
        path: String,
        /// `Type::operation` of every matching descriptor
        candidates: Vec<String>,
    },
    /// Two descriptors were registered for the same method and template shape
    DuplicateRoute {
        /// HTTP method
        method: String,
        /// Path template
        template: String,
    },
    /// A descriptor failed validation at registration
    InvalidDescriptor {
        /// Path template of the descriptor
        template: String,
        /// What is wrong with it
        reason: String,
    },
    /// Writing to the response sink failed
    ResponseWrite {
        /// I/O message
        message: String,
    },
}

impl DispatchError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::BindingMismatch { .. } => ErrorKind::BindingMismatch,
            DispatchError::UnsupportedMediaType { .. } => ErrorKind::UnsupportedMediaType,
            DispatchError::Decode { .. } => ErrorKind::Decode,
            DispatchError::Encode { .. } => ErrorKind::Encode,
            DispatchError::HandlerInvocation { .. } => ErrorKind::HandlerInvocation,
            DispatchError::NoExecutor { .. } => ErrorKind::NoExecutor,
            DispatchError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            DispatchError::AmbiguousRoute { .. }
            | DispatchError::DuplicateRoute { .. }
            | DispatchError::InvalidDescriptor { .. } => ErrorKind::Configuration,
            DispatchError::ResponseWrite { .. } => ErrorKind::ResponseWrite,
        }
    }

    /// True when the request itself is at fault (malformed, unsupported or undecodable).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::BindingMismatch | ErrorKind::UnsupportedMediaType | ErrorKind::Decode
        )
    }

    /// True when the error indicates a registration bug rather than a bad request.
    ///
    /// Fatal errors are logged at `error` level by the dispatcher.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NoExecutor | ErrorKind::ServiceUnavailable | ErrorKind::Configuration
        )
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::BindingMismatch {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "Resolved argument count does not match for '{}': {}. Expected: {}",
                operation, actual, expected
            ),
            DispatchError::UnsupportedMediaType { mime_type } => {
                write!(f, "Serializer for MIME type '{}' not found", mime_type)
            }
            DispatchError::Decode {
                parameter,
                mime_type,
                message,
            } => write!(
                f,
                "Cannot decode parameter '{}' as {}: {}",
                parameter, mime_type, message
            ),
            DispatchError::Encode { mime_type, message } => {
                write!(f, "Cannot encode response as {}: {}", mime_type, message)
            }
            DispatchError::HandlerInvocation { operation, message } => {
                write!(f, "Handler '{}' failed: {}", operation, message)
            }
            DispatchError::NoExecutor {
                declaring_type,
                operation,
            } => write!(
                f,
                "No executor found for {}::{}",
                declaring_type, operation
            ),
            DispatchError::ServiceUnavailable { declaring_type } => {
                write!(f, "No service instance for type '{}'", declaring_type)
            }
            DispatchError::AmbiguousRoute {
                method,
                path,
                candidates,
            } => write!(
                f,
                "Ambiguous route for {} {}: matched by {}",
                method,
                path,
                candidates.join(", ")
            ),
            DispatchError::DuplicateRoute { method, template } => {
                write!(f, "Duplicate route registered for {} {}", method, template)
            }
            DispatchError::InvalidDescriptor { template, reason } => {
                write!(f, "Invalid handler descriptor for '{}': {}", template, reason)
            }
            DispatchError::ResponseWrite { message } => {
                write!(f, "Failed to write response: {}", message)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Failure reported by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler ran and failed
    Failed(String),
    /// The handler produced a value with no serializable representation
    Unrepresentable(String),
}

impl HandlerError {
    /// Build a [`HandlerError::Failed`] from any message.
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    /// The message carried by either variant.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            HandlerError::Failed(m) | HandlerError::Unrepresentable(m) => m,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Failed(m) => write!(f, "{}", m),
            HandlerError::Unrepresentable(m) => write!(f, "unrepresentable result: {}", m),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Failed(format!("{err:#}"))
    }
}

/// Error returned by a [`Serializer`](crate::serializer::Serializer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializerError {
    /// Raw text is malformed for the requested type
    Decode(String),
    /// Value has no representation in this format
    Encode(String),
}

impl SerializerError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            SerializerError::Decode(m) | SerializerError::Encode(m) => m,
        }
    }
}

impl fmt::Display for SerializerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializerError::Decode(m) => write!(f, "decode error: {}", m),
            SerializerError::Encode(m) => write!(f, "encode error: {}", m),
        }
    }
}

impl std::error::Error for SerializerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        let err = DispatchError::BindingMismatch {
            operation: "get_item".into(),
            expected: 2,
            actual: 1,
        };
        assert!(err.is_client_error());
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::BindingMismatch);
    }

    #[test]
    fn test_fatal_errors() {
        let err = DispatchError::NoExecutor {
            declaring_type: "ItemService".into(),
            operation: "get_item".into(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "No executor found for ItemService::get_item");

        let err = DispatchError::DuplicateRoute {
            method: "GET".into(),
            template: "/items/{id}".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_handler_error_from_anyhow() {
        let err: HandlerError = anyhow::anyhow!("boom").into();
        assert_eq!(err, HandlerError::Failed("boom".into()));
        assert_eq!(err.message(), "boom");
    }
}
