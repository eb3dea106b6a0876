//! # Stitch Core
//!
//! Core types shared by every Stitch crate.
//!
//! - [`Request`] - Cloneable request handle that layers can annotate
//! - [`Response`] - Cloneable response writer with an explicit finalization signal
//! - [`RequestId`] - UUID v7 request identifier used for log correlation
//! - [`MethodFilter`] - Method tag attached to every registered layer
//! - [`ChainError`] - The error value that travels through a handler chain
//!
//! Requests and responses are handles: cloning one yields another view of
//! the same underlying state, so a layer that inserts an extension or sets a
//! header is observed by every later layer of the same walk.

#![doc(html_root_url = "https://docs.rs/stitch-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod method;
mod request;
mod response;

pub use error::{BoxError, ChainError, ResponseError};
pub use method::{MethodFilter, STANDARD_METHODS};
pub use request::{Request, RequestId};
pub use response::{HttpResponse, Response};

pub use http;
