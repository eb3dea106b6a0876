//! Method filters for registered layers.

use http::Method;
use std::fmt;

/// The HTTP methods that get a dedicated registration entry point.
pub const STANDARD_METHODS: [Method; 8] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::PATCH,
];

/// Which request methods a layer responds to.
///
/// # Example
///
/// ```
/// use http::Method;
/// use stitch_core::MethodFilter;
///
/// assert!(MethodFilter::All.matches(&Method::PATCH));
/// assert!(MethodFilter::from(Method::GET).matches(&Method::GET));
/// assert!(!MethodFilter::from(Method::GET).matches(&Method::HEAD));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MethodFilter {
    /// Matches every method, including extension methods.
    #[default]
    All,
    /// Matches exactly one method.
    Only(Method),
}

impl MethodFilter {
    /// Returns `true` if a request with `method` should reach the layer.
    #[must_use]
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == method,
        }
    }

    /// Returns the method this filter is pinned to, if any.
    #[must_use]
    pub const fn method(&self) -> Option<&Method> {
        match self {
            Self::All => None,
            Self::Only(method) => Some(method),
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        Self::Only(method)
    }
}

impl From<&Method> for MethodFilter {
    fn from(method: &Method) -> Self {
        Self::Only(method.clone())
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Only(method) => f.write_str(method.as_str()),
        }
    }
}
