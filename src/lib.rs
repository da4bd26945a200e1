//! optikv: an embedded in-memory key-value store with optimistic
//! transactions
//!
//! Transactions execute without taking locks: reads and writes accumulate
//! in a private working set, and commit validates the read set against
//! every transaction that committed since the snapshot was taken
//! (backward-validation OCC). A conflict discards the transaction without
//! touching committed state; the [`retry`] driver re-runs it with
//! exponential backoff. Committed history is pruned by a background
//! garbage collector once no live transaction can still validate against
//! it.
//!
//! Keys and values are host-supplied: any `Eq + Hash + Clone` key and
//! `Clone` value work, with `Send + Sync + 'static` so the database can be
//! shared across threads.
//!
//! ```
//! use optikv::{retry, Db, Error};
//!
//! let db: Db<String, i64> = Db::new();
//!
//! let mut txn = db.begin();
//! txn.put("hits".to_string(), 1);
//! txn.commit()?;
//!
//! // Read-modify-write under contention goes through the retry driver.
//! let total = retry(&db, |txn| {
//!     let current = txn.get(&"hits".to_string()).unwrap_or(0);
//!     txn.put("hits".to_string(), current + 1);
//!     Ok::<_, Error>(current + 1)
//! })?;
//! assert_eq!(total, 2);
//! # Ok::<(), Error>(())
//! ```
//!
//! This is a library embedded in a host process: no persistence, no
//! network protocol, no replication. Commits are atomic and totally
//! ordered; blind writes (write without read) never conflict, so callers
//! needing write-skew protection must read before writing.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod background;
mod config;
mod db;
mod error;
mod handle;
mod manager;
mod retry;
mod stats;
mod store;
mod transaction;

pub use config::DbConfig;
pub use db::Db;
pub use error::{Error, Result};
pub use handle::Txn;
pub use retry::{retry, retry_with, RetryConfig};
pub use stats::DbStats;
