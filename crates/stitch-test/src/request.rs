//! Test request building.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

/// Builder for a request sent through a [`TestClient`](crate::TestClient).
///
/// Invalid headers or bodies do not panic at the call site; the first error
/// is reported by [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a builder for `method` and `uri`.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.fail(TestError::InvalidHeader(name.to_string())),
        }
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header(header::AUTHORIZATION.as_str(), value)
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `value` as the JSON body and sets the Content-Type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.body = Bytes::from(body);
                self.content_type("application/json")
            }
            Err(e) => {
                self.fail(e.into());
                self
            }
        }
    }

    /// Builds the `http::Request`.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building, or
    /// `TestError::RequestBuild` for an invalid URI.
    pub fn build(self) -> Result<http::Request<Bytes>, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut request = http::Request::builder()
            .method(self.method)
            .uri(self.uri.as_str())
            .body(self.body)
            .map_err(|e| TestError::RequestBuild(format!("{}: {e}", self.uri)))?;
        *request.headers_mut() = self.headers;
        Ok(request)
    }

    fn fail(&mut self, error: TestError) {
        self.error.get_or_insert(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let request = TestRequestBuilder::new(Method::PUT, "/items/1?force=true")
            .header("x-trace", "abc")
            .body("payload")
            .build()
            .unwrap();

        assert_eq!(request.method(), &Method::PUT);
        assert_eq!(request.uri().path(), "/items/1");
        assert_eq!(request.uri().query(), Some("force=true"));
        assert_eq!(request.headers()["x-trace"], "abc");
        assert_eq!(request.body(), "payload");
    }

    #[test]
    fn test_json_sets_content_type() {
        let request = TestRequestBuilder::new(Method::POST, "/")
            .json(&serde_json::json!({"name": "Alice"}))
            .build()
            .unwrap();

        assert_eq!(request.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(request.body(), r#"{"name":"Alice"}"#);
    }

    #[test]
    fn test_bearer_token() {
        let request = TestRequestBuilder::new(Method::GET, "/")
            .bearer_token("t0ken")
            .build()
            .unwrap();
        assert_eq!(request.headers()[header::AUTHORIZATION], "Bearer t0ken");
    }

    #[test]
    fn test_invalid_header_reported_on_build() {
        let result = TestRequestBuilder::new(Method::GET, "/")
            .header("bad header", "x")
            .build();
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[test]
    fn test_invalid_uri_reported_on_build() {
        let result = TestRequestBuilder::new(Method::GET, "http://[::1").build();
        assert!(matches!(result, Err(TestError::RequestBuild(_))));
    }
}
