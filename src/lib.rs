//! Advertising ledger services with cross-service trace propagation.

pub mod config;
pub mod error;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod propagation;
pub mod rates;
pub mod storage;

pub use config::schema::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use http::ServiceServer;
pub use lifecycle::Shutdown;
