//! Request handle and request identifiers.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Extensions, HeaderMap, Method, Uri, Version};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it a good fit for log correlation.
///
/// # Example
///
/// ```
/// use stitch_core::RequestId;
///
/// let id = RequestId::new();
/// let parsed: RequestId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Mutable part of a request.
#[derive(Debug, Default)]
struct RequestState {
    headers: HeaderMap,
    body: Bytes,
    extensions: Extensions,
}

#[derive(Debug)]
struct RequestInner {
    id: RequestId,
    method: Method,
    uri: Uri,
    version: Version,
    state: Mutex<RequestState>,
}

/// A handle to an incoming request.
///
/// Cloning a `Request` is cheap and every clone observes the same headers,
/// body and extensions. The method, URI and version are fixed at creation;
/// headers and typed extensions may be changed by any layer and the change is
/// visible to the layers that run after it.
///
/// # Example
///
/// ```
/// use http::Method;
/// use stitch_core::Request;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct User(&'static str);
///
/// let req = Request::new(Method::GET, "/profile");
/// let view = req.clone();
/// req.insert(User("ada"));
///
/// assert_eq!(view.get::<User>(), Some(User("ada")));
/// ```
#[derive(Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

impl Request {
    /// Creates an empty request with the given method and URI.
    ///
    /// An unparsable URI falls back to `/`.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let uri = uri.parse().unwrap_or_else(|_| Uri::from_static("/"));
        Self::from_parts(method, uri, Version::HTTP_11, HeaderMap::new(), Bytes::new())
    }

    /// Creates a request from its individual parts.
    #[must_use]
    pub fn from_parts(
        method: Method,
        uri: Uri,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self::with_id(RequestId::new(), method, uri, version, headers, body)
    }

    /// Creates a request with a caller-supplied request ID.
    #[must_use]
    pub fn with_id(
        id: RequestId,
        method: Method,
        uri: Uri,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            inner: Arc::new(RequestInner {
                id,
                method,
                uri,
                version,
                state: Mutex::new(RequestState {
                    headers,
                    body,
                    extensions: Extensions::new(),
                }),
            }),
        }
    }

    /// Converts an `http::Request` with a collected body.
    ///
    /// Extensions already present on the `http::Request` are carried over.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let req = Self::from_parts(parts.method, parts.uri, parts.version, parts.headers, body);
        req.inner.state.lock().extensions = parts.extensions;
        req
    }

    /// Returns the request ID.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.inner.id
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Returns the path component of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    /// Returns the HTTP version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.inner.version
    }

    /// Returns a copy of a header value.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<HeaderValue> {
        self.inner.state.lock().headers.get(name.as_ref()).cloned()
    }

    /// Returns a header value as an owned string, if it is valid UTF-8.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<String> {
        self.header(name)
            .and_then(|value| value.to_str().ok().map(ToString::to_string))
    }

    /// Returns a snapshot of all request headers.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.inner.state.lock().headers.clone()
    }

    /// Sets a request header, replacing any existing values.
    ///
    /// Returns `false` if the name or value is not valid HTTP.
    pub fn set_header(&self, name: impl AsRef<str>, value: impl AsRef<str>) -> bool {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_ref().as_bytes()),
            HeaderValue::from_str(value.as_ref()),
        ) else {
            return false;
        };
        self.inner.state.lock().headers.insert(name, value);
        true
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> Bytes {
        self.inner.state.lock().body.clone()
    }

    /// Replaces the request body.
    pub fn set_body(&self, body: impl Into<Bytes>) {
        self.inner.state.lock().body = body.into();
    }

    /// Stores a typed value on the request, returning the previous one.
    pub fn insert<T>(&self, value: T) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner.state.lock().extensions.insert(value)
    }

    /// Returns a copy of a typed value stored on the request.
    #[must_use]
    pub fn get<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner.state.lock().extensions.get::<T>().cloned()
    }

    /// Removes a typed value from the request.
    pub fn remove<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner.state.lock().extensions.remove::<T>()
    }

    /// Returns `true` if a value of type `T` is stored on the request.
    #[must_use]
    pub fn contains<T>(&self) -> bool
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner.state.lock().extensions.get::<T>().is_some()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.inner.id)
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .field("version", &self.inner.version)
            .finish_non_exhaustive()
    }
}
