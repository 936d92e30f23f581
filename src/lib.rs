// src/lib.rs

//! reddit-sync library
//!
//! Incrementally copies a subreddit's newest posts, each with its top
//! comment, into a CSV file or a Google Sheet.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
