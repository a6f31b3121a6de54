//! Source ingestion and run orchestration.
//!
//! Each source is read line by line through parse → window → classify →
//! aggregate. Sources are ingested in parallel into partial snapshots which
//! are merged in source order once every source is exhausted.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;

use super::classifier::classify;
use super::log_parser::parse_line;
use super::time_window::admit;
use super::types::*;

/// Source-level failures. Both are recovered locally: the run continues
/// with the remaining sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum IngestError {
    #[error("Source '{label}' unavailable ({path}): {reason}")]
    SourceUnavailable {
        label: String,
        path: String,
        reason: String,
    },

    #[error("Read failure in source '{label}' ({path}) after {lines_read} lines: {reason}")]
    SourceReadFailure {
        label: String,
        path: String,
        lines_read: u64,
        reason: String,
    },
}

/// Run-level failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("No log entries found for time filter '{filter}' in {} source(s)", .sources.len())]
    NoDataProduced {
        filter: TimeFilter,
        sources: Vec<SourceReport>,
    },
}

/// A named log file to ingest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSource {
    pub label: String,
    pub path: PathBuf,
}

impl LogSource {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Label a source by its file name
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(label, path)
    }
}

/// What happened to one source during ingestion
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SourceReport {
    pub label: String,
    pub path: String,
    pub lines_read: u64,
    pub accepted: u64,
    pub malformed: u64,
    pub out_of_window: u64,
    pub unverifiable_timestamps: u64,
    pub failure: Option<IngestError>,
}

impl SourceReport {
    fn new(source: &LogSource) -> Self {
        Self {
            label: source.label.clone(),
            path: source.path.display().to_string(),
            ..Default::default()
        }
    }

    fn reject(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::Malformed => self.malformed += 1,
            Rejection::OutOfWindow => self.out_of_window += 1,
            Rejection::UnverifiableTimestamp => self.unverifiable_timestamps += 1,
        }
    }
}

/// Partial result for a single source
#[derive(Debug, Clone)]
pub struct SourceIngest {
    pub stats: AggregateStats,
    pub report: SourceReport,
}

/// Drive one line through parse, window, classify and aggregate.
fn process_line(
    line: &str,
    label: &str,
    window: Option<&TimeWindow>,
    stats: &mut AggregateStats,
) -> Result<(), Rejection> {
    let entry = parse_line(line, label)?;
    admit(window, entry.timestamp)?;
    let class = classify(&entry);
    stats.update(&entry, class.is_bot, class.is_suspicious);
    Ok(())
}

/// Ingest a byte stream into an existing snapshot.
///
/// Invalid UTF-8 is replaced rather than aborting the source. An I/O error
/// stops this source; lines accepted before it stay in `stats`.
pub fn ingest_reader_into<R: BufRead>(
    source: &LogSource,
    mut reader: R,
    window: Option<&TimeWindow>,
    stats: &mut AggregateStats,
) -> SourceReport {
    let mut report = SourceReport::new(source);
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                report.lines_read += 1;
                let line = String::from_utf8_lossy(&buf);
                match process_line(&line, &source.label, window, stats) {
                    Ok(()) => report.accepted += 1,
                    Err(rejection) => report.reject(rejection),
                }
            }
            Err(e) => {
                let failure = IngestError::SourceReadFailure {
                    label: source.label.clone(),
                    path: report.path.clone(),
                    lines_read: report.lines_read,
                    reason: e.to_string(),
                };
                log::warn!("{}", failure);
                report.failure = Some(failure);
                break;
            }
        }
    }

    report
}

/// Ingest a byte stream into a fresh partial snapshot
pub fn ingest_reader<R: BufRead>(
    source: &LogSource,
    reader: R,
    window: Option<&TimeWindow>,
) -> SourceIngest {
    let mut stats = AggregateStats::new();
    let report = ingest_reader_into(source, reader, window, &mut stats);
    SourceIngest { stats, report }
}

fn open_source(source: &LogSource) -> Result<BufReader<File>, IngestError> {
    let file = File::open(&source.path).map_err(|e| IngestError::SourceUnavailable {
        label: source.label.clone(),
        path: source.path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(BufReader::with_capacity(64 * 1024, file))
}

/// Ingest a single log file into `stats`.
///
/// The file handle lives only for the duration of this call.
pub fn ingest_file_into(
    source: &LogSource,
    window: Option<&TimeWindow>,
    stats: &mut AggregateStats,
) -> SourceReport {
    log::info!("Analyzing {} ({})", source.label, source.path.display());

    let report = match open_source(source) {
        Ok(reader) => ingest_reader_into(source, reader, window, stats),
        Err(e) => {
            log::warn!("{}", e);
            let mut report = SourceReport::new(source);
            report.failure = Some(e);
            return report;
        }
    };

    log::info!("{}: {} entries accepted", source.label, report.accepted);
    log::debug!(
        "{}: {} lines read, {} malformed, {} out of window, {} unverifiable timestamps",
        source.label,
        report.lines_read,
        report.malformed,
        report.out_of_window,
        report.unverifiable_timestamps
    );
    report
}

/// Ingest a single log file into a fresh partial snapshot
pub fn ingest_file(source: &LogSource, window: Option<&TimeWindow>) -> SourceIngest {
    let mut stats = AggregateStats::new();
    let report = ingest_file_into(source, window, &mut stats);
    SourceIngest { stats, report }
}

/// Ingest all sources in parallel. Results keep the order of `sources`.
pub fn ingest_all(sources: &[LogSource], window: Option<&TimeWindow>) -> Vec<SourceIngest> {
    log::info!("Ingesting {} sources in parallel...", sources.len());
    sources
        .par_iter()
        .map(|source| ingest_file(source, window))
        .collect()
}

/// Finalized result of one run
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub filter: TimeFilter,
    pub now: NaiveDateTime,
    pub window: Option<TimeWindow>,
    pub sources: Vec<SourceReport>,
    pub stats: AggregateStats,
}

impl Analysis {
    /// Result with no accepted entries, used to report a `NoDataProduced` run
    pub fn empty(filter: TimeFilter, now: NaiveDateTime, sources: Vec<SourceReport>) -> Self {
        Self {
            filter,
            now,
            window: filter.resolve(now),
            sources,
            stats: AggregateStats::new(),
        }
    }

    pub fn description(&self) -> String {
        self.filter.describe(self.now.date())
    }

    /// Labels of every configured source, in order
    pub fn source_labels(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.label.as_str()).collect()
    }
}

/// Orchestrates one analysis run over an explicit list of sources
#[derive(Debug, Clone)]
pub struct Analyzer {
    sources: Vec<LogSource>,
    filter: TimeFilter,
}

impl Analyzer {
    pub fn new(sources: Vec<LogSource>, filter: TimeFilter) -> Self {
        Self { sources, filter }
    }

    pub fn sources(&self) -> &[LogSource] {
        &self.sources
    }

    pub fn filter(&self) -> TimeFilter {
        self.filter
    }

    /// Ingest every source on the rayon pool and merge the partials.
    pub fn run(&self, now: NaiveDateTime) -> Result<Analysis, AnalysisError> {
        let window = self.filter.resolve(now);
        let partials = ingest_all(&self.sources, window.as_ref());

        let mut stats = AggregateStats::new();
        let mut reports = Vec::with_capacity(partials.len());
        for partial in partials {
            stats.merge(&partial.stats);
            reports.push(partial.report);
        }

        self.finish(now, window, stats, reports)
    }

    /// Ingest every source on the calling thread into one snapshot.
    pub fn run_sequential(&self, now: NaiveDateTime) -> Result<Analysis, AnalysisError> {
        let window = self.filter.resolve(now);
        let mut stats = AggregateStats::new();
        let reports = self
            .sources
            .iter()
            .map(|source| ingest_file_into(source, window.as_ref(), &mut stats))
            .collect();

        self.finish(now, window, stats, reports)
    }

    fn finish(
        &self,
        now: NaiveDateTime,
        window: Option<TimeWindow>,
        stats: AggregateStats,
        sources: Vec<SourceReport>,
    ) -> Result<Analysis, AnalysisError> {
        if stats.is_empty() {
            return Err(AnalysisError::NoDataProduced {
                filter: self.filter,
                sources,
            });
        }

        log::info!(
            "Processed {} log entries from {} sources",
            stats.total_requests,
            sources.len()
        );

        Ok(Analysis {
            filter: self.filter,
            now,
            window,
            sources,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::{self, Cursor, Read};

    const LINE: &str = r#"10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 512 "-" "Mozilla/5.0""#;

    fn source() -> LogSource {
        LogSource::new("access.log", "/var/log/nginx/access.log")
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 10, 10)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    /// Yields its data, then fails every subsequent read
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                Err(io::Error::new(io::ErrorKind::Other, "device went away"))
            } else {
                Ok(n)
            }
        }
    }

    #[test]
    fn test_from_path_uses_file_name() {
        let source = LogSource::from_path("/var/log/nginx/wiki_access.log");
        assert_eq!(source.label, "wiki_access.log");
        assert_eq!(source.path, PathBuf::from("/var/log/nginx/wiki_access.log"));
    }

    #[test]
    fn test_ingest_counts_and_rejections() {
        let input = format!("{LINE}\nnot a log line\n{LINE}\n");
        let result = ingest_reader(&source(), Cursor::new(input), None);

        assert_eq!(result.report.lines_read, 3);
        assert_eq!(result.report.accepted, 2);
        assert_eq!(result.report.malformed, 1);
        assert_eq!(result.report.failure, None);
        assert_eq!(result.stats.total_requests, 2);
        assert_eq!(result.stats.per_source[0].label, "access.log");
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut input = LINE.replace("Mozilla/5.0", "Mozilla/\u{1}").into_bytes();
        // Swap the placeholder for a byte that is never valid UTF-8
        for byte in input.iter_mut().filter(|b| **b == 1) {
            *byte = 0xff;
        }
        input.push(b'\n');

        let result = ingest_reader(&source(), Cursor::new(input), None);
        assert_eq!(result.report.accepted, 1);
        assert_eq!(result.stats.user_agents.len(), 1);
    }

    #[test]
    fn test_last_line_without_newline() {
        let result = ingest_reader(&source(), Cursor::new(LINE.to_string()), None);
        assert_eq!(result.report.accepted, 1);
    }

    #[test]
    fn test_read_failure_keeps_partial_results() {
        let reader = BufReader::new(FailingReader {
            data: Cursor::new(format!("{LINE}\n{LINE}\n").into_bytes()),
        });
        let result = ingest_reader(&source(), reader, None);

        assert_eq!(result.report.accepted, 2);
        assert_eq!(result.stats.total_requests, 2);
        assert!(matches!(
            result.report.failure,
            Some(IngestError::SourceReadFailure { lines_read: 2, .. })
        ));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let missing = LogSource::new("gone", "/nonexistent/path/access.log");
        let result = ingest_file(&missing, None);
        assert_eq!(result.stats.total_requests, 0);
        assert!(matches!(
            result.report.failure,
            Some(IngestError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_window_rejections_are_counted() {
        let yesterday = LINE.replace("10/Oct/2023", "09/Oct/2023");
        let unparseable = LINE.replace("10/Oct/2023:13:55:36", "garbled");
        let input = format!("{LINE}\n{yesterday}\n{unparseable}\n");
        let window = TimeFilter::Today.resolve(now());

        let result = ingest_reader(&source(), Cursor::new(input), window.as_ref());
        assert_eq!(result.report.accepted, 1);
        assert_eq!(result.report.out_of_window, 1);
        assert_eq!(result.report.unverifiable_timestamps, 1);
        assert_eq!(result.stats.total_requests, 1);
    }

    #[test]
    fn test_run_without_data_reports_no_data() {
        let analyzer = Analyzer::new(vec![LogSource::new("gone", "/nonexistent/a.log")], TimeFilter::AllTime);
        match analyzer.run(now()) {
            Err(AnalysisError::NoDataProduced { filter, sources }) => {
                assert_eq!(filter, TimeFilter::AllTime);
                assert_eq!(sources.len(), 1);
                assert!(sources[0].failure.is_some());
            }
            Ok(_) => panic!("expected NoDataProduced"),
        }
    }
}
