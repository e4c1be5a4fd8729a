//! Flare project discovery
//!
//! A project is a directory holding a `.flprj` file. Its language comes
//! from the `xml:lang` attribute of the project file's root element.

use crate::config::Config;
use crate::document::{Document, ParseError, DEFAULT_LANGUAGE};
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extension of Flare project files
pub const PROJECT_EXTENSION: &str = "flprj";

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("No .flprj project file found in {0}")]
    NotFound(PathBuf),
    #[error("Failed to read project file {file}: {source}")]
    ReadProject { file: PathBuf, source: ParseError },
    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Failed to scan project directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// An opened Flare project
#[derive(Debug, Clone)]
pub struct Project {
    /// Path of the `.flprj` file
    pub file: PathBuf,
    /// Directory holding the project file
    pub dir: PathBuf,
    /// Lower-cased project language
    pub language: String,
}

impl Project {
    /// Open a project from its `.flprj` file or the directory that holds it
    pub fn open(path: &Path) -> Result<Self, ProjectError> {
        let file = if path.is_dir() {
            Self::find(path)?
        } else {
            path.to_path_buf()
        };

        let document = Document::parse_file(&file, DEFAULT_LANGUAGE).map_err(|source| {
            ProjectError::ReadProject {
                file: file.clone(),
                source,
            }
        })?;
        let language = match document.root().attribute("xml:lang").trim() {
            "" => DEFAULT_LANGUAGE.to_string(),
            lang => lang.to_lowercase(),
        };
        let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();

        debug!("Project {} uses language {}", file.display(), language);
        Ok(Self { file, dir, language })
    }

    /// Find the first project file in a directory
    pub fn find(dir: &Path) -> Result<PathBuf, ProjectError> {
        let pattern = dir.join(format!("*.{PROJECT_EXTENSION}"));
        let mut found: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(Result::ok)
            .collect();
        found.sort();
        found
            .into_iter()
            .next()
            .ok_or_else(|| ProjectError::NotFound(dir.to_path_buf()))
    }

    /// Files under the configured scan directories, minus exclusions, sorted
    pub fn files(&self, config: &Config) -> Result<Vec<PathBuf>, ProjectError> {
        let mut files = Vec::new();
        for scan_dir in &config.scan_dirs {
            let root = self.dir.join(scan_dir);
            if !root.is_dir() {
                debug!("Skipping missing directory {}", root.display());
                continue;
            }
            for entry in WalkDir::new(&root) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(&self.dir).unwrap_or(entry.path());
                if config.is_file_excluded(relative) {
                    debug!("Excluding {}", relative.display());
                    continue;
                }
                files.push(entry.into_path());
            }
        }
        files.sort_by_key(|path| path.to_string_lossy().to_lowercase());
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use std::fs;
    use tempfile::TempDir;

    fn project_dir(flprj: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Manual.flprj"), flprj).unwrap();
        fs::create_dir_all(dir.path().join("Content/Resources")).unwrap();
        fs::create_dir_all(dir.path().join("Project/TOCs")).unwrap();
        fs::write(dir.path().join("Content/b.htm"), "<html/>").unwrap();
        fs::write(dir.path().join("Content/A.htm"), "<html/>").unwrap();
        fs::write(dir.path().join("Content/Resources/c.flsnp"), "<html/>").unwrap();
        fs::write(dir.path().join("Project/TOCs/Main.fltoc"), "<CatapultToc/>").unwrap();
        fs::write(dir.path().join("Output.htm"), "<html/>").unwrap();
        dir
    }

    #[test]
    fn test_open_reads_language() {
        let dir = project_dir(r#"<CatapultProject xml:lang="FR-CA" />"#);
        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.language, "fr-ca");
        assert_eq!(project.file, dir.path().join("Manual.flprj"));
        assert_eq!(project.dir, dir.path());
    }

    #[test]
    fn test_open_defaults_language() {
        let dir = project_dir("<CatapultProject />");
        let project = Project::open(&dir.path().join("Manual.flprj")).unwrap();
        assert_eq!(project.language, DEFAULT_LANGUAGE);
    }

    #[test]
    fn test_open_without_project_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Project::open(dir.path()), Err(ProjectError::NotFound(_))));
    }

    #[test]
    fn test_open_broken_project_file() {
        let dir = project_dir("<CatapultProject>");
        assert!(matches!(
            Project::open(dir.path()),
            Err(ProjectError::ReadProject { .. })
        ));
    }

    #[test]
    fn test_files_sorted_and_scoped() {
        let dir = project_dir("<CatapultProject />");
        let project = Project::open(dir.path()).unwrap();
        let files = project.files(&Config::default()).unwrap();
        let relative: Vec<String> = files
            .iter()
            .map(|f| {
                f.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(
            relative,
            vec![
                "Content/A.htm",
                "Content/b.htm",
                "Content/Resources/c.flsnp",
                "Project/TOCs/Main.fltoc",
            ]
        );
    }

    #[test]
    fn test_files_excluded() {
        let dir = project_dir("<CatapultProject />");
        let project = Project::open(dir.path()).unwrap();
        let config_file: ConfigFile = serde_json::from_str(
            r#"{"exclude": ["Content/Resources/**"], "scanDirs": ["Content"]}"#,
        )
        .unwrap();
        let config = Config::from_config_file(config_file).unwrap();
        let files = project.files(&config).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files
            .iter()
            .all(|f| f.extension().is_some_and(|e| e == "htm")));
    }
}
