//! Inbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! POST /messages
//!     → request.rs (request ID, propagated on the response)
//!     → server.rs (trace, timeout, body limit, JSON decode)
//!     → Relay::ingest
//!     → response.rs (RelayError → status code)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::IngestServer;
