//! Core data types for access log analysis.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};

/// A single request parsed from a combined-format access log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub ip: String,
    /// Timestamp exactly as it appeared between the brackets
    pub timestamp_raw: String,
    /// Parsed local wall-clock time; `None` when the raw value is unparseable
    pub timestamp: Option<NaiveDateTime>,
    pub method: String,
    pub path: String,
    pub protocol: String,
    pub status: u16,
    /// Response size; `None` when the log recorded `-`
    pub size: Option<u64>,
    pub referrer: String,
    pub user_agent: String,
    pub source_label: String,
}

/// Time filter selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TimeFilter {
    /// Every entry, regardless of timestamp
    #[default]
    AllTime,
    /// Since local midnight
    Today,
    /// Since Monday midnight
    ThisWeek,
    /// Since midnight of the 1st
    ThisMonth,
}

impl std::fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeFilter::AllTime => "all-time",
            TimeFilter::Today => "today",
            TimeFilter::ThisWeek => "this-week",
            TimeFilter::ThisMonth => "this-month",
        };
        write!(f, "{}", s)
    }
}

/// Inclusive `[start, end]` range of local wall-clock instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Build a window, swapping the bounds if they arrive reversed.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Both ends are inclusive.
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Why a line did not make it into the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rejection {
    /// Line does not match the combined log grammar
    Malformed,
    /// Parsed timestamp lies outside the active window
    OutOfWindow,
    /// Window is bounded but the timestamp could not be parsed
    UnverifiableTimestamp,
}

/// Classifier output for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Classification {
    pub is_bot: bool,
    pub is_suspicious: bool,
}

/// Counter that remembers the order in which keys were first seen.
///
/// Ranking sorts by descending count and breaks ties by first-seen order, so
/// the result never depends on hash iteration order.
#[derive(Debug, Clone)]
pub struct RankedCounter<K> {
    entries: Vec<(K, u64)>,
    index: HashMap<K, usize>,
}

impl<K> Default for RankedCounter<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> RankedCounter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &K) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &K, count: u64) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += count,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key.clone(), count));
            }
        }
    }

    pub fn get(&self, key: &K) -> u64 {
        self.index.get(key).map(|&i| self.entries[i].1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Iterate in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.entries.iter().map(|(k, c)| (k, *c))
    }

    /// All keys, count descending, ties by first-seen order.
    pub fn ranked(&self) -> Vec<(&K, u64)> {
        let mut ranked: Vec<(&K, u64)> = self.iter().collect();
        // stable sort keeps first-seen order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    pub fn top(&self, n: usize) -> Vec<(&K, u64)> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    /// Add every count of `other`; keys new to `self` are appended in
    /// `other`'s first-seen order.
    pub fn merge(&mut self, other: &RankedCounter<K>) {
        for (key, count) in other.iter() {
            self.add(key, count);
        }
    }
}

impl<K: PartialEq> PartialEq for RankedCounter<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Serialize> Serialize for RankedCounter<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

/// A ranked key with its share of total requests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<K> {
    pub key: K,
    pub count: u64,
    pub percentage: f64,
}

/// Per-source request counters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SourceStats {
    pub label: String,
    pub requests: u64,
    pub unique_ips: BTreeSet<String>,
}

/// An error response (status >= 400) kept for the recent-errors section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub status: u16,
    pub ip: String,
    pub path: String,
    pub timestamp: String,
    pub user_agent: String,
    pub source_label: String,
}

impl From<&LogEntry> for ErrorRecord {
    fn from(entry: &LogEntry) -> Self {
        Self {
            status: entry.status,
            ip: entry.ip.clone(),
            path: entry.path.clone(),
            timestamp: entry.timestamp_raw.clone(),
            user_agent: entry.user_agent.clone(),
            source_label: entry.source_label.clone(),
        }
    }
}

/// Traffic statistics accumulated over one run.
///
/// Created empty, updated once per accepted entry, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateStats {
    pub total_requests: u64,
    pub unique_ips: BTreeSet<String>,
    pub status_codes: BTreeMap<u16, u64>,
    pub methods: RankedCounter<String>,
    pub top_pages: RankedCounter<String>,
    pub top_ips: RankedCounter<String>,
    pub user_agents: RankedCounter<String>,
    pub hourly_traffic: [u64; 24],
    pub daily_traffic: BTreeMap<NaiveDate, u64>,
    /// Saturates at `u64::MAX`
    pub bytes_transferred: u64,
    pub bot_requests: RankedCounter<String>,
    pub suspicious_ips: RankedCounter<String>,
    pub error_requests: Vec<ErrorRecord>,
    /// In first-seen source order
    pub per_source: Vec<SourceStats>,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one accepted entry into the snapshot.
    pub fn update(&mut self, entry: &LogEntry, is_bot: bool, is_suspicious: bool) {
        self.total_requests += 1;

        let source = self.source_mut(&entry.source_label);
        source.requests += 1;
        source.unique_ips.insert(entry.ip.clone());

        self.unique_ips.insert(entry.ip.clone());
        self.top_ips.increment(&entry.ip);
        *self.status_codes.entry(entry.status).or_insert(0) += 1;
        self.methods.increment(&entry.method);
        self.top_pages.increment(&entry.path);
        self.user_agents.increment(&entry.user_agent);

        if let Some(size) = entry.size {
            self.bytes_transferred = self.bytes_transferred.saturating_add(size);
        }

        // An unparseable timestamp only skips the time buckets here; the
        // window filter drops such entries earlier when a window is active.
        if let Some(ts) = entry.timestamp {
            self.hourly_traffic[ts.hour() as usize] += 1;
            *self.daily_traffic.entry(ts.date()).or_insert(0) += 1;
        }

        if is_bot {
            self.bot_requests.increment(&entry.ip);
        }

        if entry.status >= 400 {
            self.error_requests.push(ErrorRecord::from(entry));
        }

        if is_suspicious {
            self.suspicious_ips.increment(&entry.ip);
        }
    }

    /// Merge a partial snapshot produced from later sources.
    ///
    /// Counters add, sets union, error lists concatenate. Merging partials in
    /// source order yields the same snapshot as one sequential pass.
    pub fn merge(&mut self, other: &AggregateStats) {
        self.total_requests += other.total_requests;
        self.unique_ips.extend(other.unique_ips.iter().cloned());
        for (status, count) in &other.status_codes {
            *self.status_codes.entry(*status).or_insert(0) += count;
        }
        self.methods.merge(&other.methods);
        self.top_pages.merge(&other.top_pages);
        self.top_ips.merge(&other.top_ips);
        self.user_agents.merge(&other.user_agents);
        for (slot, count) in self.hourly_traffic.iter_mut().zip(other.hourly_traffic.iter()) {
            *slot += count;
        }
        for (day, count) in &other.daily_traffic {
            *self.daily_traffic.entry(*day).or_insert(0) += count;
        }
        self.bytes_transferred = self.bytes_transferred.saturating_add(other.bytes_transferred);
        self.bot_requests.merge(&other.bot_requests);
        self.suspicious_ips.merge(&other.suspicious_ips);
        self.error_requests.extend(other.error_requests.iter().cloned());
        for source in &other.per_source {
            let mine = self.source_mut(&source.label);
            mine.requests += source.requests;
            mine.unique_ips.extend(source.unique_ips.iter().cloned());
        }
    }

    fn source_mut(&mut self, label: &str) -> &mut SourceStats {
        let pos = match self.per_source.iter().position(|s| s.label == label) {
            Some(pos) => pos,
            None => {
                self.per_source.push(SourceStats {
                    label: label.to_string(),
                    ..Default::default()
                });
                self.per_source.len() - 1
            }
        };
        &mut self.per_source[pos]
    }

    // ------------------------------------------------------------------
    // Read-only query surface for reports and exports
    // ------------------------------------------------------------------

    pub fn is_empty(&self) -> bool {
        self.total_requests == 0
    }

    pub fn unique_ip_count(&self) -> usize {
        self.unique_ips.len()
    }

    pub fn bot_request_total(&self) -> u64 {
        self.bot_requests.total()
    }

    pub fn error_count(&self) -> usize {
        self.error_requests.len()
    }

    /// Share of total requests, in percent
    pub fn percentage(&self, count: u64) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            count as f64 / self.total_requests as f64 * 100.0
        }
    }

    fn with_percentage(&self, ranked: Vec<(&String, u64)>) -> Vec<Ranked<String>> {
        ranked
            .into_iter()
            .map(|(key, count)| Ranked {
                key: key.clone(),
                count,
                percentage: self.percentage(count),
            })
            .collect()
    }

    pub fn top_ips(&self, n: usize) -> Vec<Ranked<String>> {
        self.with_percentage(self.top_ips.top(n))
    }

    /// Every IP in ranking order (used by the CSV export)
    pub fn ranked_ips(&self) -> Vec<Ranked<String>> {
        self.with_percentage(self.top_ips.ranked())
    }

    /// Status codes ascending, with percentage
    pub fn status_histogram(&self) -> Vec<Ranked<u16>> {
        self.status_codes
            .iter()
            .map(|(status, count)| Ranked {
                key: *status,
                count: *count,
                percentage: self.percentage(*count),
            })
            .collect()
    }

    pub fn method_histogram(&self) -> Vec<Ranked<String>> {
        self.with_percentage(self.methods.ranked())
    }

    pub fn top_pages(&self, n: usize) -> Vec<Ranked<String>> {
        self.with_percentage(self.top_pages.top(n))
    }

    pub fn top_user_agents(&self, n: usize) -> Vec<Ranked<String>> {
        self.with_percentage(self.user_agents.top(n))
    }

    pub fn top_bot_ips(&self, n: usize) -> Vec<Ranked<String>> {
        self.with_percentage(self.bot_requests.top(n))
    }

    pub fn top_suspicious_ips(&self, n: usize) -> Vec<Ranked<String>> {
        self.with_percentage(self.suspicious_ips.top(n))
    }

    /// The `days` most recent calendar days that saw traffic, oldest first
    pub fn recent_days(&self, days: usize) -> Vec<(NaiveDate, u64)> {
        let skip = self.daily_traffic.len().saturating_sub(days);
        self.daily_traffic
            .iter()
            .skip(skip)
            .map(|(day, count)| (*day, *count))
            .collect()
    }

    /// The last `k` error records in encounter order
    pub fn recent_errors(&self, k: usize) -> &[ErrorRecord] {
        let skip = self.error_requests.len().saturating_sub(k);
        &self.error_requests[skip..]
    }
}
