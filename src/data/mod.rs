//! Remote data access: the paginated datastore client and its session cache.

pub mod cache;
pub mod client;

pub use cache::{CacheKey, CacheStatus, FetchCache};
pub use client::{FetchOutcome, HttpPageSource, PageQuery, PageSource, Rem20Client, YearError};
