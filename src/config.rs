use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::analysis::{LogSource, TimeFilter};

/// Selector that expands to every configured source
pub const ALL_SOURCES: &str = "all";

/// Top-level configuration structure that mirrors the YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Named log sources (name -> access log path)
    #[serde(default)]
    pub sources: BTreeMap<String, PathBuf>,
    /// Defaults applied when the command line does not override them
    #[serde(default)]
    pub defaults: Defaults,
}

/// Report defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    /// Time filter used when none is given on the command line
    pub time_filter: TimeFilter,
    /// N for top-N report sections
    pub top: usize,
    /// Number of recent error requests shown
    pub recent_errors: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            time_filter: TimeFilter::AllTime,
            top: 10,
            recent_errors: 5,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid source configuration: {0}")]
    InvalidSources(String),
    #[error("Invalid defaults: {0}")]
    InvalidDefaults(String),
    #[error("Unknown log source '{name}' (configured: {known})")]
    UnknownSource { name: String, known: String },
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, path) in &self.sources {
            if name.is_empty() {
                return Err(ValidationError::InvalidSources(
                    "source name cannot be empty".to_string(),
                ));
            }
            if name == ALL_SOURCES {
                return Err(ValidationError::InvalidSources(format!(
                    "'{}' is reserved and cannot be used as a source name",
                    ALL_SOURCES
                )));
            }
            if name.contains('/') {
                return Err(ValidationError::InvalidSources(format!(
                    "source name '{}' cannot contain '/'",
                    name
                )));
            }
            if path.as_os_str().is_empty() {
                return Err(ValidationError::InvalidSources(format!(
                    "path for source '{}' cannot be empty",
                    name
                )));
            }
        }

        if self.defaults.top == 0 {
            return Err(ValidationError::InvalidDefaults(
                "top must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve command-line selectors into log sources.
    ///
    /// Resolution rules:
    /// 1. `all` expands to every configured source
    /// 2. A selector containing `/` is an explicit file path
    /// 3. Anything else is looked up in the `sources` table
    ///
    /// Duplicate paths are kept once, in first-mentioned order.
    pub fn resolve_sources(&self, selectors: &[String]) -> Result<Vec<LogSource>, ValidationError> {
        if selectors.is_empty() {
            return Err(ValidationError::InvalidSources(
                "no log sources selected".to_string(),
            ));
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        for selector in selectors {
            if selector == ALL_SOURCES {
                if self.sources.is_empty() {
                    return Err(ValidationError::InvalidSources(format!(
                        "'{}' selected but no sources are configured",
                        ALL_SOURCES
                    )));
                }
                paths.extend(self.sources.values().cloned());
            } else if selector.contains('/') {
                paths.push(PathBuf::from(selector));
            } else {
                let path = self.sources.get(selector).ok_or_else(|| ValidationError::UnknownSource {
                    name: selector.clone(),
                    known: self.known_sources(),
                })?;
                paths.push(path.clone());
            }
        }

        let mut sources: Vec<LogSource> = Vec::with_capacity(paths.len());
        for path in paths {
            if !sources.iter().any(|s| s.path == path) {
                sources.push(LogSource::from_path(&path));
            }
        }
        Ok(sources)
    }

    fn known_sources(&self) -> String {
        if self.sources.is_empty() {
            "none".to_string()
        } else {
            self.sources.keys().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let yaml = r#"
sources:
  start: /var/log/nginx/start_access.log
  wiki: /var/log/nginx/wiki_access.log
defaults:
  time_filter: this-week
  top: 20
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_parsing() {
        let config = config();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.defaults.time_filter, TimeFilter::ThisWeek);
        assert_eq!(config.defaults.top, 20);
        // Unspecified default keeps its value
        assert_eq!(config.defaults.recent_errors, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(config.sources.is_empty());
        assert_eq!(config.defaults, Defaults::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<Config, _> = serde_yaml::from_str("logs:\n  a: /x\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_reserved_source_name() {
        let mut config = config();
        config.sources.insert("all".to_string(), PathBuf::from("/x.log"));
        assert!(matches!(config.validate(), Err(ValidationError::InvalidSources(_))));
    }

    #[test]
    fn test_zero_top_rejected() {
        let mut config = config();
        config.defaults.top = 0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidDefaults(_))));
    }

    #[test]
    fn test_resolve_named_and_explicit_sources() {
        let sources = config()
            .resolve_sources(&args(&["wiki", "./logs/other_access.log"]))
            .unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].label, "wiki_access.log");
        assert_eq!(sources[0].path, PathBuf::from("/var/log/nginx/wiki_access.log"));
        assert_eq!(sources[1].label, "other_access.log");
    }

    #[test]
    fn test_resolve_all_deduplicates() {
        let sources = config().resolve_sources(&args(&["start", "all"])).unwrap();
        let labels: Vec<&str> = sources.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["start_access.log", "wiki_access.log"]);
    }

    #[test]
    fn test_resolve_errors() {
        let config = config();
        assert!(matches!(
            config.resolve_sources(&args(&["pad"])),
            Err(ValidationError::UnknownSource { .. })
        ));
        assert!(config.resolve_sources(&[]).is_err());
        assert!(Config::default().resolve_sources(&args(&["all"])).is_err());
    }
}
