//! CSV export of per-IP request counts.
//!
//! Layout: filter description, analysed sources, a blank row, then one
//! `IP,Requests,Percentage` row per distinct IP in ranking order.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use color_eyre::eyre::{eyre, Context, Result};

use super::ingest::Analysis;

/// Default export file name, e.g. `nginx_analysis_today_20231010_200000.csv`
pub fn default_csv_path(analysis: &Analysis, generated_at: NaiveDateTime) -> PathBuf {
    PathBuf::from(format!(
        "nginx_analysis_{}_{}.csv",
        analysis.filter,
        generated_at.format("%Y%m%d_%H%M%S")
    ))
}

/// Write the CSV document to any writer
pub fn write_csv<W: Write>(analysis: &Analysis, writer: W) -> Result<()> {
    let mut preamble = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    preamble.write_record(["Time filter", analysis.description().as_str()])?;
    preamble.write_record(["Analyzed files", analysis.source_labels().join(", ").as_str()])?;

    // An empty record serializes as `""`; write a bare newline instead.
    let mut writer = preamble
        .into_inner()
        .map_err(|e| eyre!("Failed to flush CSV preamble: {}", e.error()))?;
    writer.write_all(b"\n")?;

    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    csv.write_record(["IP", "Requests", "Percentage"])?;

    for ip in analysis.stats.ranked_ips() {
        csv.write_record([
            ip.key.as_str(),
            ip.count.to_string().as_str(),
            format!("{:.2}%", ip.percentage).as_str(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Write the CSV export to `path`
pub fn export_csv(analysis: &Analysis, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV export {}", path.display()))?;
    write_csv(analysis, file)
        .with_context(|| format!("Failed to write CSV export {}", path.display()))?;

    log::info!("CSV export written to {}", path.display());
    Ok(())
}
