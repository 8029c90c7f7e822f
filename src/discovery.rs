//! Finds the Markdown files to format.

use crate::config::Settings;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::path::{Path, PathBuf};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern { pattern: String, source: ignore::Error },

    #[error("Path does not exist: {0}")]
    MissingPath(String),
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m)))
}

/// Expand `paths` into a sorted, de-duplicated list of Markdown files.
///
/// Files given explicitly are always kept, whatever their extension or the
/// exclude patterns. Directories are walked for `*.md` / `*.markdown`,
/// honouring `.gitignore` (unless disabled) and the configured excludes.
pub fn find_markdown_files(paths: &[PathBuf], settings: &Settings) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            dirs.push(path.clone());
        } else {
            return Err(DiscoveryError::MissingPath(path.display().to_string()));
        }
    }

    if let Some((first, rest)) = dirs.split_first() {
        let mut walk_builder = WalkBuilder::new(first);
        for dir in rest {
            walk_builder.add(dir);
        }

        if !settings.exclude.is_empty() {
            let mut override_builder = OverrideBuilder::new(first);
            for pattern in &settings.exclude {
                override_builder
                    .add(&format!("!{pattern}"))
                    .map_err(|source| DiscoveryError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
            }
            let overrides = override_builder.build().map_err(|source| DiscoveryError::InvalidPattern {
                pattern: settings.exclude.join(","),
                source,
            })?;
            walk_builder.overrides(overrides);
        }

        let use_gitignore = settings.respect_gitignore;
        walk_builder.ignore(use_gitignore);
        walk_builder.git_ignore(use_gitignore);
        walk_builder.git_global(use_gitignore);
        walk_builder.git_exclude(use_gitignore);
        walk_builder.parents(use_gitignore);
        walk_builder.hidden(true);
        walk_builder.require_git(false);

        for result in walk_builder.build() {
            match result {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && is_markdown(path) {
                        files.push(path.strip_prefix("./").unwrap_or(path).to_path_buf());
                    }
                }
                Err(err) => log::warn!("Error walking directory: {err}"),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_markdown() {
        assert!(is_markdown(Path::new("README.md")));
        assert!(is_markdown(Path::new("doc.MARKDOWN")));
        assert!(!is_markdown(Path::new("script.sh")));
        assert!(!is_markdown(Path::new("Makefile")));
    }

    #[test]
    fn test_walks_directories_for_markdown() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("docs/nested")).unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        fs::write(root.join("docs/nested/guide.markdown"), "").unwrap();
        fs::write(root.join("docs/notes.txt"), "").unwrap();

        let files = find_markdown_files(&[root.to_path_buf()], &Settings::default()).unwrap();
        assert_eq!(
            files,
            vec![root.join("README.md"), root.join("docs/nested/guide.markdown")]
        );
    }

    #[test]
    fn test_exclude_patterns() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join("a.md"), "").unwrap();
        fs::write(root.join("vendor/b.md"), "").unwrap();
        fs::write(root.join("CHANGELOG.md"), "").unwrap();

        let settings = Settings {
            exclude: vec!["vendor".to_string(), "CHANGELOG.md".to_string()],
            ..Default::default()
        };
        let files = find_markdown_files(&[root.to_path_buf()], &settings).unwrap();
        assert_eq!(files, vec![root.join("a.md")]);
    }

    #[test]
    fn test_explicit_files_always_kept() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("notes.txt");
        fs::write(&file, "").unwrap();

        let settings = Settings {
            exclude: vec!["*.txt".to_string()],
            ..Default::default()
        };
        let files = find_markdown_files(&[file.clone(), file.clone()], &settings).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_missing_path() {
        let temp = tempdir().unwrap();
        let err = find_markdown_files(&[temp.path().join("nope")], &Settings::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingPath(_)));
    }
}
