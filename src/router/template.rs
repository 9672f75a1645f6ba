use crate::error::DispatchError;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
/// JSF Rule: No heap allocations in the hot path for common cases.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// # JSF Optimization (P0)
///
/// Param names use `Arc<str>` instead of `String` because:
/// - Names come from the compiled template (known at startup)
/// - `Arc::clone()` is O(1) atomic increment vs O(n) string copy
/// - Values remain `String` as they're per-request data from the URL
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A route template such as `/items/{id}` compiled to an anchored regex.
///
/// Literal segments are escaped, each `{name}` segment becomes a single
/// `([^/]+)` capture, and empty segments are ignored so `/items/` and
/// `/items` compile to the same pattern.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    regex: Regex,
    variables: Vec<Arc<str>>,
    shape: String,
}

impl PathTemplate {
    /// Compile a template.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidDescriptor`] when the template does not
    /// start with `/`, has an unbalanced or empty `{}` segment, or repeats a
    /// variable name.
    pub fn parse(template: &str) -> Result<Self, DispatchError> {
        let invalid = |reason: &str| DispatchError::InvalidDescriptor {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        if !template.starts_with('/') {
            return Err(invalid("template must start with '/'"));
        }

        // Reserve space for the final regex string and parameter list
        let mut pattern = String::with_capacity(template.len() + 5);
        let mut shape = String::with_capacity(template.len());
        pattern.push('^');
        let mut variables: Vec<Arc<str>> = Vec::with_capacity(template.matches('{').count());

        for segment in template.split('/') {
            if segment.is_empty() {
                continue;
            }
            if segment.starts_with('{') && segment.ends_with('}') {
                let name = &segment[1..segment.len() - 1];
                if name.is_empty() || name.contains('{') || name.contains('}') {
                    return Err(invalid("path variable segments must be '{name}'"));
                }
                if variables.iter().any(|v| v.as_ref() == name) {
                    return Err(invalid("path variable names must be unique"));
                }
                pattern.push_str("/([^/]+)");
                shape.push_str("/{}");
                variables.push(Arc::from(name));
            } else if segment.contains('{') || segment.contains('}') {
                return Err(invalid("path variables must span a whole segment"));
            } else {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
                shape.push('/');
                shape.push_str(segment);
            }
        }

        if shape.is_empty() {
            pattern.push('/');
            shape.push('/');
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            raw: template.to_string(),
            regex,
            variables,
            shape,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Ordered variable names.
    #[must_use]
    pub fn variables(&self) -> &[Arc<str>] {
        &self.variables
    }

    /// Template with variable names erased (`/items/{}`), used to detect duplicates.
    #[must_use]
    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// Whether the template declares a variable with this name.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.as_ref() == name)
    }

    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extract percent-decoded path variables, or `None` if the path does not match.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (idx, name) in self.variables.iter().enumerate() {
            if let Some(m) = caps.get(idx + 1) {
                let value = urlencoding::decode(m.as_str())
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| m.as_str().to_string());
                params.push((Arc::clone(name), value));
            }
        }
        Some(params)
    }
}
