//! GongChi (工池) Worker Pool
//!
//! A concurrency-bounded priority task pool. Tasks are opaque asynchronous
//! operations; the pool limits how many run at once, orders pending work by
//! priority (and optionally by estimated size), tracks performance metrics,
//! and supports dynamic reconfiguration and graceful shutdown.
//!
//! # Example
//!
//! ```no_run
//! use gongchi::{TaskOptions, WorkerPool};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool: WorkerPool<u64> = WorkerPool::new();
//!
//!     let handle = pool.submit(
//!         "sum",
//!         async { Ok((0..100u64).sum()) },
//!         TaskOptions::new().priority(5),
//!     );
//!
//!     let total = handle.await?;
//!     println!("sum = {total}");
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/gongchi")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod errors;
pub mod pool;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use errors::{PoolError, PoolResult};
pub use pool::{
    MetricsObserver, MetricsSnapshot, PoolConfig, TaskHandle, TaskId, TaskOptions, TaskState,
    WorkerPool,
};
pub use thiserror::Error;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "GongChi (工池)";
