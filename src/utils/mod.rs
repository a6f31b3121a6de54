//! Shared utilities: report formatting helpers.

pub mod format;

pub use format::{format_bytes, format_count, status_text, truncate_display};
