//! Configuration parsing and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("No versions configured")]
    NoVersions,

    #[error("Invalid version id {0:?}: ids must be non-empty and contain no path separators")]
    InvalidVersionId(String),

    #[error("Duplicate version id: {0}")]
    DuplicateVersion(String),

    #[error("Version {0} sets a ref but no repository is configured")]
    RefWithoutRepository(String),

    #[error("default_version {0:?} does not match any configured version")]
    UnknownDefaultVersion(String),
}

/// Main configuration struct matching the jepsite.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub repository: Option<RepositoryConfig>,

    /// Absent means every Markdown file; an explicit empty list matches nothing
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,

    #[serde(default)]
    pub exclude_globs: Vec<String>,

    #[serde(default)]
    pub default_version: Option<String>,

    pub versions: Vec<VersionConfig>,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

fn default_base_url() -> String {
    String::from("/")
}

fn default_output() -> PathBuf {
    PathBuf::from("site")
}

fn default_cache() -> PathBuf {
    PathBuf::from(".jepsite")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub title: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_output")]
    pub output: PathBuf,

    #[serde(default = "default_cache")]
    pub cache: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            cache: default_cache(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    pub id: String,

    #[serde(default)]
    pub label: Option<String>,

    /// Git ref checked out for this version
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,

    /// Spec source root inside the checkout, or relative to the config file
    #[serde(default)]
    pub sub_path: Option<PathBuf>,

    #[serde(default)]
    pub local_docs: Option<PathBuf>,

    #[serde(default)]
    pub include_globs: Option<Vec<String>>,

    #[serde(default)]
    pub exclude_globs: Option<Vec<String>>,
}

impl VersionConfig {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.versions.is_empty() {
            return Err(ConfigError::NoVersions);
        }

        let mut seen = HashSet::new();
        for version in &self.versions {
            let id = version.id.trim();
            if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
                return Err(ConfigError::InvalidVersionId(version.id.clone()));
            }
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateVersion(version.id.clone()));
            }
            if version.git_ref.is_some() && self.repository.is_none() {
                return Err(ConfigError::RefWithoutRepository(version.id.clone()));
            }
        }

        if let Some(default) = &self.default_version {
            if !seen.contains(default.as_str()) {
                return Err(ConfigError::UnknownDefaultVersion(default.clone()));
            }
        }

        Ok(())
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Get the cache directory, resolved relative to config file
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.cache)
    }

    /// Where the shared Git clone lives
    pub fn checkout_dir(&self) -> PathBuf {
        self.cache_dir().join("source")
    }

    /// Spec source root for a version
    ///
    /// With a repository this lies inside the checkout; otherwise `sub_path`
    /// is taken relative to the config file.
    pub fn source_root(&self, version: &VersionConfig) -> PathBuf {
        let base = if self.repository.is_some() {
            self.checkout_dir()
        } else {
            self.resolve_path(Path::new(""))
        };
        match &version.sub_path {
            Some(sub) if !sub.as_os_str().is_empty() => base.join(sub),
            _ => base,
        }
    }

    /// Local override root for a version, if configured
    pub fn local_docs_root(&self, version: &VersionConfig) -> Option<PathBuf> {
        version.local_docs.as_ref().map(|p| self.resolve_path(p))
    }

    pub fn include_globs_for<'a>(&'a self, version: &'a VersionConfig) -> &'a [String] {
        version
            .include_globs
            .as_deref()
            .unwrap_or(&self.include_globs)
    }

    pub fn exclude_globs_for<'a>(&'a self, version: &'a VersionConfig) -> &'a [String] {
        version
            .exclude_globs
            .as_deref()
            .unwrap_or(&self.exclude_globs)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }

    /// Normalized base URL with leading and trailing slash ("/foo/" or "/")
    pub fn normalized_base_url(&self) -> String {
        normalize_base_url(&self.site.base_url)
    }
}

/// Ensure base URLs have a leading and trailing slash
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }

    let mut s = String::with_capacity(trimmed.len() + 2);
    s.push('/');
    for part in trimmed.split('/').filter(|p| !p.is_empty()) {
        s.push_str(part);
        s.push('/');
    }
    s
}
