//! Bridges hyper requests into a handler chain.
//!
//! [`ChainService`] collects the request body, builds the shared
//! [`Request`]/[`Response`] pair, walks the chain on its own task and answers
//! once the response is finalized. A chain that never finalizes is cut off by
//! the request timeout with `504 Gateway Timeout`.

use bytes::Bytes;
use http::header::HeaderValue;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use std::convert::Infallible;
use std::time::{Duration, Instant};
use stitch_chain::{BoxFuture, Chain};
use stitch_core::{BoxError, HttpResponse, Request, RequestId, Response};
use stitch_telemetry::log_request_complete;
use stitch_telemetry::metrics::{record_request, record_timeout, InFlightGuard};

use crate::config::{ServerConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Header carrying the request ID in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A hyper service that runs every request through a [`Chain`].
///
/// # Example
///
/// ```rust,ignore
/// use stitch_chain::{terminal, Chain};
/// use stitch_server::ChainService;
///
/// let service = ChainService::new(Chain::new().get(terminal(|_req, res| async move {
///     res.end("hello")?;
///     Ok(())
/// })));
/// let response = service.dispatch(http::Request::new(bytes::Bytes::new())).await;
/// ```
#[derive(Debug, Clone)]
pub struct ChainService {
    chain: Chain,
    request_timeout: Option<Duration>,
    max_body_bytes: Option<usize>,
}

impl ChainService {
    /// Wraps a chain with the default request timeout and body limit.
    #[must_use]
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES),
        }
    }

    /// Wraps a chain with limits taken from a server configuration.
    #[must_use]
    pub fn from_config(chain: Chain, config: &ServerConfig) -> Self {
        Self {
            chain,
            request_timeout: config.request_timeout(),
            max_body_bytes: config.max_body_bytes(),
        }
    }

    /// Sets the request timeout. `None` waits for the chain indefinitely.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, max: Option<usize>) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Returns the wrapped chain.
    #[must_use]
    pub const fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Collects a streaming body, then dispatches the request.
    ///
    /// Bodies over the limit are answered with `413 Payload Too Large`, and
    /// bodies that fail to read with `400 Bad Request`. The chain is not run
    /// in either case.
    pub async fn serve<B>(&self, request: http::Request<B>) -> HttpResponse
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();

        let collected = match self.max_body_bytes {
            Some(limit) => Limited::new(body, limit).collect().await,
            None => body.collect().await.map_err(Into::into),
        };

        match collected {
            Ok(collected) => {
                self.dispatch(http::Request::from_parts(parts, collected.to_bytes()))
                    .await
            }
            Err(error) if error.is::<LengthLimitError>() => {
                tracing::warn!(http.method = %parts.method, http.path = %parts.uri.path(), "Request body exceeds limit");
                plain(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to read request body");
                plain(StatusCode::BAD_REQUEST, "Bad Request")
            }
        }
    }

    /// Runs a request with a collected body through the chain.
    ///
    /// An incoming `x-request-id` header is reused when it is a valid UUID;
    /// the ID is echoed on the response. `HEAD` responses keep their headers
    /// but lose their body.
    pub async fn dispatch(&self, request: http::Request<Bytes>) -> HttpResponse {
        let started = Instant::now();
        let _in_flight = InFlightGuard::new();

        let (parts, body) = request.into_parts();
        let id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<RequestId>().ok())
            .unwrap_or_default();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();

        let req = Request::with_id(id, parts.method, parts.uri, parts.version, parts.headers, body);
        let res = Response::new();

        let walk = tokio::spawn({
            let chain = self.chain.clone();
            let res = res.clone();
            async move { chain.handle(req, res).await }
        });

        let finished = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, res.finished()).await.is_ok(),
            None => {
                res.finished().await;
                true
            }
        };

        if !finished {
            walk.abort();
            record_timeout(method.as_str());
            tracing::warn!(request_id = %id, http.method = %method, http.path = %path, "Handler chain did not finish in time");
            // Closes the response so late writers see it as finished.
            let _ = if res.headers_sent() {
                res.end(b"")
            } else {
                res.send_text(StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout")
            };
        }

        let mut response = res.to_http();
        if method == Method::HEAD {
            *response.body_mut() = Full::new(Bytes::new());
        }
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            response
                .headers_mut()
                .entry(REQUEST_ID_HEADER)
                .or_insert(value);
        }

        let elapsed = started.elapsed();
        let status = response.status().as_u16();
        record_request(method.as_str(), status, elapsed);
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        log_request_complete!(id, method, path, status, duration_ms);

        response
    }
}

impl Service<http::Request<Incoming>> for ChainService {
    type Response = HttpResponse;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<HttpResponse, Infallible>>;

    fn call(&self, request: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.serve(request).await) })
    }
}

/// Converts a chain into a [`ChainService`].
pub trait IntoChainService {
    /// Wraps `self` with the default limits.
    fn into_service(self) -> ChainService;
}

impl IntoChainService for Chain {
    fn into_service(self) -> ChainService {
        ChainService::new(self)
    }
}

fn plain(status: StatusCode, body: &str) -> HttpResponse {
    let res = Response::new();
    let _ = res.send_text(status, body);
    res.to_http()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_chain::terminal;
    use stitch_core::ChainError;

    fn hello() -> Chain {
        Chain::new().get(terminal(|_req, res| async move {
            res.set_header("x-greeting", "yes")?;
            res.end("hello")?;
            Ok(())
        }))
    }

    fn request(method: Method, body: impl Into<Bytes>) -> http::Request<Bytes> {
        http::Request::builder()
            .method(method)
            .uri("/")
            .body(body.into())
            .unwrap()
    }

    async fn body_of(response: HttpResponse) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_dispatch_finalized_response() {
        let response = hello().into_service().dispatch(request(Method::GET, "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-greeting"], "yes");
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(body_of(response).await, "hello");
    }

    #[tokio::test]
    async fn test_dispatch_exhausted_chain_is_not_found() {
        let response = hello().into_service().dispatch(request(Method::POST, "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "Not Found");
    }

    #[tokio::test]
    async fn test_head_response_has_no_body() {
        let chain = Chain::new().head(terminal(|_req, res| async move {
            res.set_header("content-length", "5")?;
            res.end("hello")?;
            Ok(())
        }));
        let response = chain.into_service().dispatch(request(Method::HEAD, "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-length"], "5");
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_request_body_reaches_the_chain() {
        let chain = Chain::new().post(terminal(|req, res| async move {
            res.end(req.body())?;
            Ok(())
        }));
        let response = chain.into_service().dispatch(request(Method::POST, "payload")).await;
        assert_eq!(body_of(response).await, "payload");
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_reused() {
        let id = RequestId::new();
        let chain = Chain::new().get(terminal(|req, res| async move {
            res.end(req.id().to_string())?;
            Ok(())
        }));
        let mut req = request(Method::GET, "");
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());

        let response = chain.into_service().dispatch(req).await;
        assert_eq!(response.headers()[REQUEST_ID_HEADER], id.to_string().as_str());
        assert_eq!(body_of(response).await, id.to_string());
    }

    #[tokio::test]
    async fn test_invalid_request_id_is_replaced() {
        let mut req = request(Method::GET, "");
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, HeaderValue::from_static("not-a-uuid"));

        let response = hello().into_service().dispatch(req).await;
        let echoed = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(echoed.parse::<RequestId>().is_ok());
    }

    #[tokio::test]
    async fn test_halted_chain_times_out() {
        let chain = Chain::new().all(|_req, _res, next| async move {
            drop(next);
            Ok(())
        });
        let service = chain
            .into_service()
            .with_request_timeout(Some(Duration::from_millis(20)));

        let response = service.dispatch(request(Method::GET, "")).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_of(response).await, "Gateway Timeout");
    }

    #[tokio::test]
    async fn test_unhandled_error_is_internal_server_error() {
        let chain = Chain::new().all(|_req, _res, _next| async move { Err(ChainError::msg("nope")) });
        let response = chain.into_service().dispatch(request(Method::GET, "")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let service = hello().into_service().with_max_body_bytes(Some(4));
        let req = http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Full::new(Bytes::from_static(b"too large")))
            .unwrap();

        let response = service.serve(req).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_within_limit_is_served() {
        let service = hello().into_service().with_max_body_bytes(Some(4));
        let req = http::Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Full::new(Bytes::from_static(b"ok")))
            .unwrap();

        let response = service.serve(req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
