//! Response writer with an explicit finalization signal.
//!
//! A [`Response`] accumulates status, headers and body while a handler chain
//! runs. Calling [`Response::end`] finalizes it: the finalization flag flips,
//! anyone awaiting [`Response::finished`] is woken, and every later write is
//! rejected with [`ResponseError::AlreadyFinished`] without touching the
//! stored response.
//!
//! Two observable states mirror a classic HTTP writer:
//!
//! - **headers sent** - the first body write happened; status and headers
//!   are frozen from then on.
//! - **finished** - the body was ended; the response is complete.

use crate::error::ResponseError;
use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// The HTTP response type produced from a finished [`Response`].
pub type HttpResponse = http::Response<Full<Bytes>>;

#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    headers_sent: bool,
    finished: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            headers_sent: false,
            finished: false,
        }
    }
}

struct ResponseInner {
    state: Mutex<ResponseState>,
    finished: watch::Sender<bool>,
}

/// A handle to the response being produced for a request.
///
/// Cloning a `Response` is cheap; every clone writes into the same response.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use stitch_core::{Response, ResponseError};
///
/// let res = Response::new();
/// res.set_header("x-powered-by", "stitch").unwrap();
/// res.end("hello").unwrap();
///
/// assert!(res.is_finished());
/// assert_eq!(res.status(), StatusCode::OK);
/// assert_eq!(res.end("again"), Err(ResponseError::AlreadyFinished));
/// assert_eq!(res.body(), "hello");
/// ```
#[derive(Clone)]
pub struct Response {
    inner: Arc<ResponseInner>,
}

impl Response {
    /// Creates an empty `200 OK` response.
    #[must_use]
    pub fn new() -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            inner: Arc::new(ResponseInner {
                state: Mutex::new(ResponseState::default()),
                finished,
            }),
        }
    }

    /// Returns the current status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.state.lock().status
    }

    /// Sets the status code.
    pub fn set_status(&self, status: StatusCode) -> Result<(), ResponseError> {
        let mut state = self.inner.state.lock();
        ensure_headers_open(&state, "status")?;
        state.status = status;
        Ok(())
    }

    /// Returns a copy of a response header value.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<HeaderValue> {
        self.inner.state.lock().headers.get(name.as_ref()).cloned()
    }

    /// Returns a snapshot of all response headers.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.inner.state.lock().headers.clone()
    }

    /// Sets a header, replacing existing values with the same name.
    pub fn set_header(
        &self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<(), ResponseError> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        let mut state = self.inner.state.lock();
        ensure_headers_open(&state, "headers")?;
        state.headers.insert(name, value);
        Ok(())
    }

    /// Appends a header value without replacing existing ones.
    pub fn append_header(
        &self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<(), ResponseError> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        let mut state = self.inner.state.lock();
        ensure_headers_open(&state, "headers")?;
        state.headers.append(name, value);
        Ok(())
    }

    /// Removes a header, returning its first value.
    pub fn remove_header(&self, name: impl AsRef<str>) -> Result<Option<HeaderValue>, ResponseError> {
        let mut state = self.inner.state.lock();
        ensure_headers_open(&state, "headers")?;
        Ok(state.headers.remove(name.as_ref()))
    }

    /// Writes a body chunk. Status and headers are frozen afterwards.
    pub fn write(&self, chunk: impl AsRef<[u8]>) -> Result<(), ResponseError> {
        let mut state = self.inner.state.lock();
        if state.finished {
            return Err(ResponseError::AlreadyFinished);
        }
        state.headers_sent = true;
        state.body.extend_from_slice(chunk.as_ref());
        Ok(())
    }

    /// Writes the final body chunk and finalizes the response.
    ///
    /// Pass an empty slice to finish without adding to the body.
    pub fn end(&self, chunk: impl AsRef<[u8]>) -> Result<(), ResponseError> {
        {
            let mut state = self.inner.state.lock();
            if state.finished {
                return Err(ResponseError::AlreadyFinished);
            }
            state.body.extend_from_slice(chunk.as_ref());
            state.headers_sent = true;
            state.finished = true;
        }
        self.inner.finished.send_replace(true);
        Ok(())
    }

    /// Sets the status and a `text/plain` body, then finalizes.
    pub fn send_text(&self, status: StatusCode, body: impl AsRef<str>) -> Result<(), ResponseError> {
        self.set_status(status)?;
        self.set_header(CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")?;
        self.end(body.as_ref())
    }

    /// Returns `true` once the first body byte has been written.
    #[must_use]
    pub fn headers_sent(&self) -> bool {
        self.inner.state.lock().headers_sent
    }

    /// Returns `true` once the response has been ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.state.lock().finished
    }

    /// Waits until the response is finalized.
    ///
    /// Completes immediately if it already is.
    pub async fn finished(&self) {
        let mut receiver = self.inner.finished.subscribe();
        // The sender lives as long as `self`, so this only ends on `true`.
        let _ = receiver.wait_for(|finished| *finished).await;
    }

    /// Returns a copy of the body written so far.
    #[must_use]
    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.inner.state.lock().body)
    }

    /// Builds an `http::Response` from the current state.
    #[must_use]
    pub fn to_http(&self) -> HttpResponse {
        let state = self.inner.state.lock();
        let mut response = http::Response::new(Full::new(Bytes::copy_from_slice(&state.body)));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers.clone();
        response
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Response")
            .field("status", &state.status)
            .field("headers_sent", &state.headers_sent)
            .field("finished", &state.finished)
            .field("body_len", &state.body.len())
            .finish()
    }
}

fn ensure_headers_open(state: &ResponseState, what: &'static str) -> Result<(), ResponseError> {
    if state.finished {
        Err(ResponseError::AlreadyFinished)
    } else if state.headers_sent {
        Err(ResponseError::HeadersSent(what))
    } else {
        Ok(())
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ResponseError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ResponseError::InvalidHeaderName(name.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|_| ResponseError::InvalidHeaderValue {
        name: name.to_string(),
    })?;
    Ok((header_name, header_value))
}
