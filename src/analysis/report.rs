//! Report generation for access log analysis.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use super::ingest::Analysis;
use super::types::*;
use crate::utils::{format_bytes, format_count, status_text, truncate_display};

/// Section sizes for the text report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// N for the top IPs, top pages and suspicious IPs sections
    pub top: usize,
    /// K for the recent error requests section
    pub recent_errors: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top: 10,
            recent_errors: 5,
        }
    }
}

const TOP_USER_AGENTS: usize = 5;
const TOP_BOT_IPS: usize = 5;
const PAGE_WIDTH: usize = 50;
const AGENT_WIDTH: usize = 70;
const MAX_BAR: usize = 50;

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push(format!("{}:", title));
}

/// Render the text report into lines
pub fn render_text_report(analysis: &Analysis, options: &ReportOptions) -> Vec<String> {
    let stats = &analysis.stats;
    let description = analysis.description();
    let mut lines: Vec<String> = Vec::new();

    // Header
    lines.push("=".repeat(80));
    lines.push(format!("NGINX MULTI-LOG ANALYSIS - {}", description.to_uppercase()));
    lines.push("=".repeat(80));

    // Source overview
    if analysis.sources.len() > 1 {
        section(&mut lines, "ANALYZED LOG FILES");
        for source in &stats.per_source {
            lines.push(format!(
                "   {:<25} {:>8} requests, {:>6} unique IPs",
                source.label,
                format_count(source.requests),
                format_count(source.unique_ips.len() as u64)
            ));
        }
        for report in analysis.sources.iter().filter(|r| r.failure.is_some()) {
            if let Some(ref failure) = report.failure {
                lines.push(format!("   {:<25} skipped: {}", report.label, failure));
            }
        }
    }

    // Basic statistics
    section(&mut lines, &format!("BASIC STATISTICS ({})", description));
    lines.push(format!("   Total requests: {}", format_count(stats.total_requests)));
    lines.push(format!("   Unique IPs: {}", format_count(stats.unique_ip_count() as u64)));
    lines.push(format!("   Data transferred: {}", format_bytes(stats.bytes_transferred)));
    lines.push(format!("   Bot requests: {}", format_count(stats.bot_request_total())));
    lines.push(format!("   Error requests: {}", format_count(stats.error_count() as u64)));

    if stats.is_empty() {
        lines.push(String::new());
        lines.push(format!("No data found for time filter '{}'", analysis.filter));
        return lines;
    }

    section(&mut lines, &format!("TOP {} IP ADDRESSES", options.top));
    for ip in stats.top_ips(options.top) {
        lines.push(format!(
            "   {:<15} {:>8} requests ({:>5.1}%)",
            ip.key,
            format_count(ip.count),
            ip.percentage
        ));
    }

    section(&mut lines, "HTTP STATUS CODES");
    for status in stats.status_histogram() {
        lines.push(format!(
            "   {} {:<20} {:>8} ({:>5.1}%)",
            status.key,
            status_text(status.key),
            format_count(status.count),
            status.percentage
        ));
    }

    section(&mut lines, "HTTP METHODS");
    for method in stats.method_histogram() {
        lines.push(format!(
            "   {:<8} {:>8} ({:>5.1}%)",
            method.key,
            format_count(method.count),
            method.percentage
        ));
    }

    section(&mut lines, &format!("TOP {} PAGES", options.top));
    for page in stats.top_pages(options.top) {
        lines.push(format!(
            "   {:>6} ({:>5.1}%) {}",
            format_count(page.count),
            page.percentage,
            truncate_display(&page.key, PAGE_WIDTH)
        ));
    }

    if analysis.filter.shows_hourly() {
        section(&mut lines, "TRAFFIC BY HOUR");
        for (hour, &count) in stats.hourly_traffic.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let percentage = stats.percentage(count);
            let bar = "█".repeat((percentage as usize).min(MAX_BAR));
            lines.push(format!(
                "   {:>2}:00 {:>6} {} ({:>5.1}%)",
                hour,
                format_count(count),
                bar,
                percentage
            ));
        }
    }

    if !stats.daily_traffic.is_empty() {
        let days = analysis.filter.daily_days();
        section(&mut lines, &format!("TRAFFIC BY DAY (last {})", days));
        for (day, count) in stats.recent_days(days) {
            lines.push(format!(
                "   {} {:>8} ({:>5.1}%)",
                day.format("%Y-%m-%d"),
                format_count(count),
                stats.percentage(count)
            ));
        }
    }

    section(&mut lines, &format!("TOP {} USER AGENTS", TOP_USER_AGENTS));
    for agent in stats.top_user_agents(TOP_USER_AGENTS) {
        lines.push(format!(
            "   {:>6} ({:>5.1}%) {}",
            format_count(agent.count),
            agent.percentage,
            truncate_display(&agent.key, AGENT_WIDTH)
        ));
    }

    if !stats.bot_requests.is_empty() {
        section(&mut lines, "TOP BOT IPS");
        for bot in stats.top_bot_ips(TOP_BOT_IPS) {
            lines.push(format!("   {:<15} {:>6} bot requests", bot.key, format_count(bot.count)));
        }
    }

    if !stats.suspicious_ips.is_empty() {
        section(&mut lines, "SUSPICIOUS IPS");
        for ip in stats.top_suspicious_ips(options.top) {
            lines.push(format!(
                "   {:<15} {:>6} suspicious requests",
                ip.key,
                format_count(ip.count)
            ));
        }
    }

    if !stats.error_requests.is_empty() {
        section(&mut lines, &format!("LAST {} ERROR REQUESTS", options.recent_errors));
        for error in stats.recent_errors(options.recent_errors) {
            lines.push(format_error(error));
        }
    }

    lines.push(String::new());
    lines.push("=".repeat(80));
    lines
}

fn format_error(error: &ErrorRecord) -> String {
    format!(
        "   {} {} {} [{}]",
        error.status,
        error.ip,
        truncate_display(&error.path, 40),
        error.source_label
    )
}

/// Print the text report to stdout
pub fn print_report(analysis: &Analysis, options: &ReportOptions) {
    for line in render_text_report(analysis, options) {
        println!("{}", line);
    }
}

/// JSON document written by [`generate_json_report`]
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    description: String,
    #[serde(flatten)]
    analysis: &'a Analysis,
}

/// Generate JSON report
pub fn generate_json_report(analysis: &Analysis, output_path: &Path) -> Result<()> {
    let report = JsonReport {
        generated_at: chrono::Local::now().to_rfc3339(),
        description: analysis.description(),
        analysis,
    };
    let json = serde_json::to_string_pretty(&report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ingest::{ingest_reader, AnalysisError, Analyzer, LogSource, SourceReport};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::io::Cursor;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 10, 10)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn analysis(filter: TimeFilter, input: &str) -> Analysis {
        let source = LogSource::new("access.log", "access.log");
        let window = filter.resolve(now());
        let result = ingest_reader(&source, Cursor::new(input.to_string()), window.as_ref());
        Analysis {
            filter,
            now: now(),
            window,
            sources: vec![result.report],
            stats: result.stats,
        }
    }

    const INPUT: &str = concat!(
        r#"10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 512 "-" "Mozilla/5.0""#,
        "\n",
        r#"10.0.0.2 - - [10/Oct/2023:14:01:00 +0000] "GET /wp-login.php HTTP/1.1" 404 - "-" "curl/8.0""#,
        "\n",
    );

    #[test]
    fn test_text_report_sections() {
        let lines = render_text_report(&analysis(TimeFilter::Today, INPUT), &ReportOptions::default());
        let text = lines.join("\n");

        assert!(text.contains("NGINX MULTI-LOG ANALYSIS - TODAY (10.10.2023)"));
        assert!(text.contains("Total requests: 2"));
        assert!(text.contains("Data transferred: 512.00 B"));
        assert!(text.contains("Bot requests: 1"));
        assert!(text.contains("404 Not Found"));
        assert!(text.contains("TRAFFIC BY HOUR"));
        assert!(text.contains("TOP BOT IPS"));
        assert!(text.contains("SUSPICIOUS IPS"));
        assert!(text.contains("404 10.0.0.2 /wp-login.php [access.log]"));
        // Single source: no per-source overview
        assert!(!text.contains("ANALYZED LOG FILES"));
    }

    #[test]
    fn test_hourly_section_only_for_short_filters() {
        let lines = render_text_report(&analysis(TimeFilter::AllTime, INPUT), &ReportOptions::default());
        assert!(!lines.iter().any(|l| l.contains("TRAFFIC BY HOUR")));
        assert!(lines.iter().any(|l| l.contains("TRAFFIC BY DAY (last 7)")));
    }

    #[test]
    fn test_empty_report_stops_after_basics() {
        let lines = render_text_report(&analysis(TimeFilter::AllTime, ""), &ReportOptions::default());
        let text = lines.join("\n");
        assert!(text.contains("No data found for time filter 'all-time'"));
        assert!(!text.contains("HTTP STATUS CODES"));
    }

    #[test]
    fn test_no_data_run_renders_empty_report() {
        let sources = vec![
            LogSource::new("a.log", "/nonexistent/a.log"),
            LogSource::new("b.log", "/nonexistent/b.log"),
        ];
        let empty = match Analyzer::new(sources, TimeFilter::Today).run(now()) {
            Err(AnalysisError::NoDataProduced { filter, sources }) => {
                Analysis::empty(filter, now(), sources)
            }
            Ok(_) => panic!("expected NoDataProduced"),
        };

        let text = render_text_report(&empty, &ReportOptions::default()).join("\n");
        assert!(text.contains("NGINX MULTI-LOG ANALYSIS - TODAY (10.10.2023)"));
        assert!(text.contains("Total requests: 0"));
        assert!(text.contains("No data found for time filter 'today'"));
        assert!(text.contains("skipped"));
        assert!(!text.contains("TOP 10 IP ADDRESSES"));
    }

    #[test]
    fn test_multi_source_overview_lists_failures() {
        let mut analysis = analysis(TimeFilter::AllTime, INPUT);
        analysis.sources.push(SourceReport {
            label: "gone.log".to_string(),
            path: "/nonexistent/gone.log".to_string(),
            failure: Some(crate::analysis::ingest::IngestError::SourceUnavailable {
                label: "gone.log".to_string(),
                path: "/nonexistent/gone.log".to_string(),
                reason: "No such file or directory".to_string(),
            }),
            ..Default::default()
        });
        let text = render_text_report(&analysis, &ReportOptions::default()).join("\n");
        assert!(text.contains("ANALYZED LOG FILES"));
        assert!(text.contains("gone.log"));
        assert!(text.contains("skipped"));
    }

    #[test]
    fn test_json_report_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        generate_json_report(&analysis(TimeFilter::AllTime, INPUT), &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["filter"], "all-time");
        assert_eq!(json["description"], "All time");
        assert_eq!(json["stats"]["total_requests"], 2);
        assert_eq!(json["stats"]["bytes_transferred"], 512);
        assert_eq!(json["sources"][0]["accepted"], 2);
    }
}
