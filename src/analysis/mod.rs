//! Access log analysis for nginx combined-format logs.
//!
//! This module parses log lines, filters them by time window, classifies bot
//! and probe traffic, and aggregates everything into a traffic snapshot.

pub mod types;
pub mod log_parser;
pub mod time_window;
pub mod classifier;
pub mod ingest;
pub mod report;
pub mod export;

pub use types::*;
pub use log_parser::{parse_line, parse_timestamp};
pub use classifier::classify;
pub use ingest::{Analysis, AnalysisError, Analyzer, IngestError, LogSource, SourceReport};
pub use report::{generate_json_report, print_report, render_text_report, ReportOptions};
pub use export::{default_csv_path, export_csv};
