//! Data orchestration for the bizboard analytics dashboard.
//!
//! Everything between the HTTP backend and the rendered views lives here:
//! the typed API client, persisted session and history, chart adapters into
//! a uniform model, KPI derivation, the query engine (cache, dedupe,
//! freshness, stale-result discard), and the view-composition services.

pub mod charts;
pub mod client;
pub mod error;
pub mod history;
pub mod kpi;
pub mod query;
pub mod services;
pub mod session;
pub mod store;
pub mod types;
pub mod util;

pub use client::{ApiClient, TransactionFilters, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResult};
pub use history::HistoryStore;
pub use query::{QueryEngine, QueryKey, QueryName, QueryState};
pub use session::Session;
pub use store::{FileStore, KvStore, MemoryStore};
pub use types::DateRange;
