//! # Promissory HTTP
//!
//! Thin HTTP request helper built on promissory deferred values.
//!
//! ## Example
//!
//! ```no_run
//! use promissory_http::{Client, ReqwestTransport, RequestOptions};
//! use promissory_runtime::TokioScheduler;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = TokioScheduler::new();
//!     let client = Client::new(scheduler.handle(), ReqwestTransport::new()?);
//!
//!     let response = client.get(
//!         "https://httpbin.org/json",
//!         RequestOptions::new().convert_json(true),
//!     );
//!
//!     let response = scheduler.run_until(response.wait()).await?;
//!     println!("{} {}: {:?}", response.status, response.message, response.json());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Canonical URL building and strict URL parsing
//! - One entry point accepting three call shapes, plus six verb helpers
//! - Status classification: `400..=511` rejects, everything else resolves
//! - Optional JSON decoding whose failure rejects the request
//! - Pluggable transport; `reqwest` in production

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;
pub mod uri;

// Re-export main types for convenience
pub use client::{Client, decode_json};
pub use config::ClientConfig;
pub use error::{RequestError, TransportError};
pub use request::{Call, Method, RequestDescriptor, RequestOptions, merge_query};
pub use response::{Body, FAILURE_STATUSES, RawResponse, Response, is_failure_status};
pub use transport::{ReqwestTransport, Transport};
pub use uri::{ParsedUrl, Query, Scheme, build_url, parse_url};
