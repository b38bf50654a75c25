//! Source file discovery with include/exclude globs

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Source root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to walk source root: {0}")]
    Walk(#[from] walkdir::Error),
}

/// `*` stays within one path segment; `**` crosses separators
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled include and exclude patterns
#[derive(Debug, Clone)]
pub struct GlobFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl GlobFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, DiscoverError> {
        Ok(Self {
            include: compile_patterns(include)?,
            exclude: compile_patterns(exclude)?,
        })
    }

    /// A path is kept when it matches any include and no exclude pattern
    pub fn matches(&self, rel_path: &str) -> bool {
        self.include
            .iter()
            .any(|p| p.matches_with(rel_path, MATCH_OPTIONS))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_with(rel_path, MATCH_OPTIONS))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, DiscoverError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| DiscoverError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Relative path with `/` separators
fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Discover files under `root`, returned as sorted `/`-separated relative paths
pub fn discover_files(root: &Path, filter: &GlobFilter) -> Result<Vec<String>, DiscoverError> {
    if !root.is_dir() {
        return Err(DiscoverError::NotADirectory(root.to_path_buf()));
    }
    if filter.include.is_empty() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            // Only the root itself is fatal; a bad entry below it is skipped
            Err(err) if err.depth() == 0 => return Err(err.into()),
            Err(err) => {
                warn!(
                    path = %err.path().map(|p| p.display().to_string()).unwrap_or_default(),
                    error = %err,
                    "Skipping unreadable entry"
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative_slash_path(root, entry.path()) else {
            continue;
        };
        // Git metadata is never content
        if rel.starts_with(".git/") {
            continue;
        }
        if filter.matches(&rel) {
            files.push(rel);
        } else {
            debug!(path = %rel, "Skipping file not selected by globs");
        }
    }

    files.sort();
    Ok(files)
}
