//! # Stitch Test
//!
//! In-memory testing for Stitch handler chains: requests run through the
//! same [`stitch_server::ChainService`] the HTTP server uses, without
//! binding a port.
//!
//! ## Example
//!
//! ```ignore
//! use stitch_chain::{terminal, Chain};
//! use stitch_test::TestClient;
//!
//! #[tokio::test]
//! async fn greets() {
//!     let app = Chain::new().get(terminal(|_req, res| async move {
//!         res.end("hello")?;
//!         Ok(())
//!     }));
//!
//!     TestClient::new(app)
//!         .get("/")
//!         .send()
//!         .await
//!         .assert_status(http::StatusCode::OK)
//!         .assert_body_eq("hello");
//! }
//! ```

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest, DEFAULT_TEST_TIMEOUT};
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
