//! Utility functions and helpers.

pub mod http;

use crate::error::{AppError, Result};

/// Normalize a subreddit argument (`r/rust`, `/r/rust/`, `rust`) to its bare name.
///
/// The name ends up in URL paths and file names, so only the characters
/// Reddit allows in subreddit names are accepted.
pub fn normalize_subreddit(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_matches('/');
    let name = trimmed
        .strip_prefix("r/")
        .or_else(|| trimmed.strip_prefix("R/"))
        .unwrap_or(trimmed);

    let valid_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if name.len() < 2 || name.len() > 21 || !valid_chars {
        return Err(AppError::validation(format!(
            "'{input}' is not a valid subreddit name"
        )));
    }
    Ok(name.to_string())
}
