//! In-memory test client.

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;
use bytes::Bytes;
use http::Method;
use std::time::Duration;
use stitch_chain::Chain;
use stitch_server::ChainService;

/// Request timeout applied by [`TestClient::new`].
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends requests through a [`Chain`] without binding a socket.
///
/// Requests take the same path as over the network: the chain runs behind a
/// [`ChainService`], so unanswered requests get the default 404, unhandled
/// errors the default 500, and `HEAD` responses lose their body.
///
/// # Example
///
/// ```ignore
/// use stitch_chain::{terminal, Chain};
/// use stitch_test::TestClient;
///
/// let client = TestClient::new(Chain::new().get(terminal(|_req, res| async move {
///     res.end("ok")?;
///     Ok(())
/// })));
///
/// client.get("/").send().await.assert_body_eq("ok");
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    service: ChainService,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `chain` with a [`DEFAULT_TEST_TIMEOUT`] request
    /// timeout and no body limit.
    pub fn new(chain: Chain) -> Self {
        Self::from_service(
            ChainService::new(chain)
                .with_request_timeout(Some(DEFAULT_TEST_TIMEOUT))
                .with_max_body_bytes(None),
        )
    }

    /// Creates a client around a configured service.
    pub const fn from_service(service: ChainService) -> Self {
        Self {
            service,
            default_headers: Vec::new(),
        }
    }

    /// Sets the request timeout. `None` waits for the chain indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.service = self.service.with_request_timeout(timeout);
        self
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Creates a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a HEAD request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Creates a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Creates a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates an OPTIONS request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Creates a TRACE request.
    pub fn trace(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::TRACE, uri)
    }

    /// Creates a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Creates a request with any method, including extension methods.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let builder = self
            .default_headers
            .iter()
            .fold(TestRequestBuilder::new(method, uri), |builder, (name, value)| {
                builder.header(name, value)
            });
        TestClientRequest {
            client: self,
            builder,
        }
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the response cannot be read;
    /// use [`try_send`](Self::try_send) to handle those cases.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build and read failures.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        let response = self.client.service.dispatch(request).await;
        TestResponse::from_http(response).await
    }
}
