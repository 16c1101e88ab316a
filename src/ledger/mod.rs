//! Advertisement ledger (orchestrator side).
//!
//! # Data Flow
//! ```text
//! POST /create_ad
//!     → types.rs (duration token)
//!     → orchestrator.rs
//!         → storage: current date ∥ site pricing (awaited)
//!         → storage: budget debit, ad insert (best-effort)
//!         → ids.rs (fresh ad id + rate id)
//!         → counter_client.rs → counter service /init_rate/{rate_id}
//! ```
//!
//! # Design Decisions
//! - Budget debit and ad creation are not atomic; counters are eventually consistent
//! - Id allocation is injected so tests control the sequence
//! - The counter service is reached through the `RateCounter` trait

pub mod counter_client;
pub mod ids;
pub mod orchestrator;
pub mod schema;
pub mod types;

pub use counter_client::{CounterClient, RateCounter};
pub use ids::{IdAllocator, SequentialIds};
pub use orchestrator::Ledger;
pub use types::{AdId, AdRecord, DurationToken, RateId};
