//! # nginx-analyzer - Multi-source nginx access log analyzer
//!
//! This library ingests nginx access logs in the combined log format from
//! several named sources, restricts them to a time window and produces a
//! traffic summary: volume, status codes, top consumers, bytes transferred,
//! bot and probe traffic, and recent errors.
//!
//! ## Architecture
//!
//! - `analysis::log_parser`: combined log format line parser
//! - `analysis::time_window`: time filter resolution and window admission
//! - `analysis::classifier`: bot user-agent and probe path detection
//! - `analysis::types`: the `AggregateStats` snapshot and its fold operation
//! - `analysis::ingest`: per-source ingestion and the parallel `Analyzer`
//! - `analysis::report` / `analysis::export`: text, JSON and CSV output
//! - `config` / `config_loader`: YAML source table and report defaults
//! - `utils`: formatting helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use nginx_analyzer::analysis::{Analyzer, LogSource, ReportOptions, TimeFilter};
//!
//! let sources = vec![
//!     LogSource::from_path("/var/log/nginx/start_access.log"),
//!     LogSource::from_path("/var/log/nginx/wiki_access.log"),
//! ];
//! let analyzer = Analyzer::new(sources, TimeFilter::ThisWeek);
//! let analysis = analyzer.run(chrono::Local::now().naive_local())?;
//!
//! nginx_analyzer::analysis::print_report(&analysis, &ReportOptions::default());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! sources:
//!   start: /var/log/nginx/start_access.log
//!   wiki: /var/log/nginx/wiki_access.log
//! defaults:
//!   time_filter: this-week   # all-time | today | this-week | this-month
//!   top: 10
//!   recent_errors: 5
//! ```
//!
//! ## Error Handling
//!
//! Unreadable sources and mid-read I/O failures are recorded per source and
//! never abort a run. Lines that do not match the log grammar are counted and
//! skipped. The only run-level failure is `AnalysisError::NoDataProduced`.

pub mod analysis;
pub mod config;
pub mod config_loader;
pub mod utils;
