//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, access log)
//!     → manager.rs | visits.rs | probe.rs (extract params + headers)
//!     → propagation boundary rule picks the tracing strategy
//!     → ledger / rates / probe operation
//!     → response.rs (status payload or forwarded reply)
//! ```

pub mod manager;
pub mod probe;
pub mod request;
pub mod response;
pub mod server;
pub mod visits;

pub use request::{request_id, X_REQUEST_ID};
pub use response::{Reply, StatusResponse};
pub use server::ServiceServer;
