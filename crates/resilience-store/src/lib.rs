//! SQLite-backed failure history and strategy blacklist.

mod error;
mod models;
mod store;

pub use error::StoreError;
pub use models::{BlacklistEntry, DailyTrend, FailureAnalytics, FailureRow, LabeledCount};
pub use store::FailureStore;
