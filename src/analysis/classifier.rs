//! Bot and probe classification.
//!
//! Two independent signals per entry: the user agent looks automated, and
//! the path looks like a scan for known attack surfaces.

use std::sync::LazyLock;

use regex::RegexSet;

use super::types::*;

/// User-agent tokens of crawlers, scrapers and scripted HTTP clients
pub const BOT_TOKENS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "scraper",
    "wget",
    "curl",
    "python",
    "java",
    "php",
    "ruby",
    "go-http-client",
];

/// Path signatures of common probes
pub const PROBE_SIGNATURES: &[&str] = &[
    // Script extensions
    r"\.php$",
    r"\.asp$",
    r"\.jsp$",
    // WordPress
    r"wp-admin",
    r"wp-login",
    // Admin and auth areas
    r"admin",
    r"login",
    r"config",
    // Sensitive files
    r"\.env",
    r"\.git",
    // Code injection
    r"eval\(",
    r"base64_decode",
];

/// Compiled classifier patterns
pub struct ClassifierPatterns {
    pub bot: RegexSet,
    pub probe: RegexSet,
}

impl ClassifierPatterns {
    pub fn new() -> Self {
        let bot_patterns = BOT_TOKENS.iter().map(|t| format!("(?i){}", regex::escape(t)));
        Self {
            bot: RegexSet::new(bot_patterns).expect("Invalid bot token set"),
            probe: RegexSet::new(PROBE_SIGNATURES).expect("Invalid probe signature set"),
        }
    }
}

pub static CLASSIFIER: LazyLock<ClassifierPatterns> = LazyLock::new(ClassifierPatterns::new);

/// Case-insensitive match against the bot token list
pub fn is_bot(user_agent: &str) -> bool {
    CLASSIFIER.bot.is_match(user_agent)
}

/// Case-sensitive match against the probe signature list
pub fn is_suspicious(path: &str) -> bool {
    CLASSIFIER.probe.is_match(path)
}

pub fn classify(entry: &LogEntry) -> Classification {
    Classification {
        is_bot: is_bot(&entry.user_agent),
        is_suspicious: is_suspicious(&entry.path),
    }
}
