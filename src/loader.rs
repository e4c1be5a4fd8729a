//! Rule loader - compiles the rule files of a rules directory

use crate::engine::RuleBook;
use crate::rules::{compile, CompileError, Rule};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name pattern of rule files
pub const RULE_FILE_PATTERN: &str = "*rule.txt";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Rules directory not found: {0}")]
    NotFound(PathBuf),
    #[error("No *rule.txt files in {0}")]
    NoRules(PathBuf),
    #[error("Failed to read rule file {file}: {source}")]
    ReadFile {
        file: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid rules directory pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Loads and compiles rule files
pub struct RuleLoader {
    rules_dir: PathBuf,
}

impl RuleLoader {
    /// Create a new rule loader
    pub fn new(rules_dir: &Path) -> Self {
        Self {
            rules_dir: rules_dir.to_path_buf(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Rule files in the directory, sorted by name
    pub fn rule_files(&self) -> Result<Vec<PathBuf>, LoaderError> {
        if !self.rules_dir.is_dir() {
            return Err(LoaderError::NotFound(self.rules_dir.clone()));
        }

        let pattern = self.rules_dir.join(RULE_FILE_PATTERN);
        let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Compile every rule file; the first broken file aborts loading
    pub fn load_all(&self) -> Result<RuleBook, LoaderError> {
        let files = self.rule_files()?;
        if files.is_empty() {
            return Err(LoaderError::NoRules(self.rules_dir.clone()));
        }

        let mut rulebook = RuleBook::new();
        for file in &files {
            rulebook.add(Self::load_file(file)?);
        }

        debug!(
            "Loaded {} rules for {} extensions from {}",
            rulebook.len(),
            rulebook.extensions().len(),
            self.rules_dir.display()
        );
        Ok(rulebook)
    }

    /// Compile a single rule file, named after its file name
    pub fn load_file(path: &Path) -> Result<Rule, LoaderError> {
        debug!("Compiling {}", path.display());
        let source = fs::read_to_string(path).map_err(|source| LoaderError::ReadFile {
            file: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(compile(&name, &source)?)
    }
}
