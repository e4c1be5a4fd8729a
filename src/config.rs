//! Configuration handling for flare-lint

use crate::Severity;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Project subdirectories scanned when none are configured
pub const DEFAULT_SCAN_DIRS: [&str; 2] = ["Content", "Project"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("Failed to parse JSON config: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("Failed to parse YAML config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(#[from] globset::Error),
    #[error("Invalid severity '{0}', expected 'error' or 'warning'")]
    InvalidSeverity(String),
}

/// Runtime lint configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `*rule.txt` files
    pub rules_dir: Option<PathBuf>,
    /// Rule files to skip, by file name
    pub disabled_rules: Vec<String>,
    /// Minimum severity to report
    pub min_severity: Severity,
    /// Files to skip, matched against paths relative to the project
    pub exclude_patterns: GlobSet,
    /// Project subdirectories to scan
    pub scan_dirs: Vec<String>,
    /// Language overriding the project's
    pub language: Option<String>,
    /// Number of parallel jobs (0 = auto, 1 = sequential)
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_dir: None,
            disabled_rules: Vec::new(),
            min_severity: Severity::Warning,
            exclude_patterns: GlobSet::empty(),
            scan_dirs: DEFAULT_SCAN_DIRS.iter().map(|d| d.to_string()).collect(),
            language: None,
            jobs: 0,
        }
    }
}

/// CLI options to merge into config
#[derive(Debug, Default)]
pub struct CliOptions {
    /// Rules directory (replaces config if set)
    pub rules_dir: Option<PathBuf>,
    /// Rules to disable (adds to config)
    pub disabled_rules: Vec<String>,
    /// Minimum severity level
    pub min_severity: Option<Severity>,
    /// Language override
    pub language: Option<String>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

/// Configuration file format (.flarelintrc.json or .flarelintrc.yaml)
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Rules directory, relative to the config file
    #[serde(default)]
    pub rules: Option<PathBuf>,

    /// Rule files to ignore
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Minimum severity: "error" or "warning"
    #[serde(default)]
    pub min_severity: Option<String>,

    /// File patterns to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Project subdirectories to scan
    #[serde(default)]
    pub scan_dirs: Vec<String>,

    /// Language tag overriding the project language
    #[serde(default)]
    pub language: Option<String>,

    /// Number of parallel jobs (0 = auto)
    #[serde(default)]
    pub jobs: usize,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut config_file: ConfigFile = if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        // Rules directory is relative to the file that names it
        if let (Some(rules), Some(base)) = (&config_file.rules, path.parent()) {
            config_file.rules = Some(base.join(rules));
        }

        Self::from_config_file(config_file)
    }

    /// Try to find and load config, walking up from `start_dir`
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let config_names = [
            ".flarelintrc.json",
            ".flarelintrc.yaml",
            ".flarelintrc.yml",
            "flarelint.json",
            "flarelint.yaml",
        ];

        let mut current = start_dir.to_path_buf();
        loop {
            for name in &config_names {
                let config_path = current.join(name);
                if config_path.exists() {
                    let config = Self::from_file(&config_path)?;
                    return Ok(Some((config_path, config)));
                }
            }

            if !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Build config from a ConfigFile
    pub fn from_config_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let mut exclude_builder = GlobSetBuilder::new();
        for pattern in &file.exclude {
            exclude_builder.add(Glob::new(pattern)?);
        }
        let exclude_patterns = exclude_builder.build()?;

        let min_severity = match file.min_severity {
            Some(s) => s.parse().map_err(ConfigError::InvalidSeverity)?,
            None => Severity::Warning,
        };

        let defaults = Self::default();
        Ok(Self {
            rules_dir: file.rules,
            disabled_rules: file.ignore,
            min_severity,
            exclude_patterns,
            scan_dirs: if file.scan_dirs.is_empty() {
                defaults.scan_dirs
            } else {
                file.scan_dirs
            },
            language: file.language,
            jobs: file.jobs,
        })
    }

    /// Merge CLI options into this config (CLI takes precedence)
    pub fn merge_cli(&mut self, opts: CliOptions) {
        if opts.rules_dir.is_some() {
            self.rules_dir = opts.rules_dir;
        }

        self.disabled_rules.extend(opts.disabled_rules);

        if let Some(sev) = opts.min_severity {
            self.min_severity = sev;
        }

        if opts.language.is_some() {
            self.language = opts.language;
        }

        if let Some(j) = opts.jobs {
            self.jobs = j;
        }
    }

    /// Check if a rule is enabled
    pub fn is_rule_enabled(&self, source: &str) -> bool {
        !self.disabled_rules.iter().any(|r| r == source)
    }

    /// Check if a file should be excluded
    pub fn is_file_excluded(&self, file_path: &Path) -> bool {
        self.exclude_patterns.is_match(file_path)
    }

    /// Check if a severity should be reported
    pub fn should_report(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }
}
