//! Pipeline entry points.
//!
//! - `run_sync`: resolve the watermark, fetch new posts, append them to storage

pub mod sync;

pub use sync::{SyncOptions, SyncReport, fetch_records, run_sync};
