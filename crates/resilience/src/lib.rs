//! A resilient execution core for AI assistants.
//!
//! `resilience` bundles the components an agent loop needs to survive a
//! hostile, flaky environment: classify opaque tool/API errors into a
//! shared vocabulary, retry transient ones with backoff, trip a circuit
//! breaker on a misbehaving operation, remember what's already failed so
//! the same approach isn't retried forever, race alternative strategies
//! when more than one way to accomplish a goal exists, and track which
//! models or skills actually perform.
//!
//! Each pattern is available as both an individual crate and as a feature
//! on this meta-crate.
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! resilience = { version = "0.1", features = ["engine"] }
//! ```
//!
//! ```rust,no_run
//! # #[cfg(feature = "engine")]
//! # {
//! use resilience::core::CancellationSource;
//! use resilience::engine::{ResilienceConfig, ResilienceEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ResilienceEngine::new(ResilienceConfig::builder().build()?)?;
//! let cancel = CancellationSource::new();
//! let outcome = engine
//!     .execute("fetch_page", None, &cancel.token(), || async { Ok::<_, std::io::Error>(42) })
//!     .await;
//! let _ = outcome;
//! # Ok(())
//! # }
//! # }
//! ```
//!
//! # Components
//!
//! - **[classifier]** — maps any `Display`-able caller error to an `ErrorKind`
//! - **[circuitbreaker]** — per-operation closed/open/half-open state machine
//! - **[retry]** — classifier-aware retry with exponential backoff and jitter
//! - **[store]** — durable SQLite-backed failure log and strategy blacklist
//! - **[analyzer]** — failure pattern detection and root-cause attribution
//! - **[explorer]** — strategy catalogue, candidate ranking, blacklist filtering
//! - **[engine]** — orchestrates retry + circuit breaker + analyzer + explorer
//!   around a single callable, including parallel strategy racing
//! - **[performance]** — per-execution metrics, rolling aggregates, "best for
//!   task" selection, ROI/trend reporting, skill-gap tracking

pub use resilience_core as core;

#[cfg(feature = "classifier")]
pub use resilience_classifier as classifier;

#[cfg(feature = "circuitbreaker")]
pub use resilience_circuitbreaker as circuitbreaker;

#[cfg(feature = "retry")]
pub use resilience_retry as retry;

#[cfg(feature = "store")]
pub use resilience_store as store;

#[cfg(feature = "analyzer")]
pub use resilience_analyzer as analyzer;

#[cfg(feature = "explorer")]
pub use resilience_explorer as explorer;

#[cfg(feature = "engine")]
pub use resilience_engine as engine;

#[cfg(feature = "performance")]
pub use resilience_performance as performance;
