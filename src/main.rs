use clap::Parser;
use color_eyre::eyre::Context;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use std::path::PathBuf;

use nginx_analyzer::analysis::{
    self, Analysis, AnalysisError, Analyzer, ReportOptions, TimeFilter,
};
use nginx_analyzer::config_loader;

/// Multi-source nginx access log analyzer with time filters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log sources: configured names, explicit paths (containing '/'), or "all"
    #[arg(required = true)]
    sources: Vec<String>,

    /// Path to a YAML configuration file with named sources and defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time filter for the analysis (default: from config, else all-time)
    #[arg(short, long, value_enum)]
    time_filter: Option<TimeFilter>,

    /// Number of entries in top-N sections
    #[arg(long)]
    top: Option<usize>,

    /// Export per-IP statistics as CSV
    #[arg(long)]
    csv: bool,

    /// CSV file name (generated when not given)
    #[arg(long, requires = "csv")]
    csv_file: Option<PathBuf>,

    /// Also write the full snapshot as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let config = config_loader::load_or_default(args.config.as_deref())?;
    let sources = config.resolve_sources(&args.sources)?;
    let filter = args.time_filter.unwrap_or(config.defaults.time_filter);
    let options = ReportOptions {
        top: args.top.unwrap_or(config.defaults.top).max(1),
        recent_errors: config.defaults.recent_errors,
    };

    info!("Starting nginx log analysis, time filter: {}", filter);
    for source in &sources {
        info!("Source {}: {}", source.label, source.path.display());
    }

    let now = chrono::Local::now().naive_local();
    let analyzer = Analyzer::new(sources, filter);
    let analysis = match analyzer.run(now) {
        Ok(analysis) => analysis,
        Err(AnalysisError::NoDataProduced { filter, sources }) => {
            for report in &sources {
                if let Some(ref failure) = report.failure {
                    warn!("{}", failure);
                }
            }
            analysis::print_report(&Analysis::empty(filter, now, sources.clone()), &options);
            return Err(AnalysisError::NoDataProduced { filter, sources }.into());
        }
    };

    analysis::print_report(&analysis, &options);

    if let Some(ref path) = args.json {
        analysis::generate_json_report(&analysis, path)?;
    }

    if args.csv {
        let path = args
            .csv_file
            .unwrap_or_else(|| analysis::default_csv_path(&analysis, now));
        analysis::export_csv(&analysis, &path)?;
        println!("\nCSV export saved: {}", path.display());
    }

    info!("Analysis complete");
    Ok(())
}
