//! Site building logic - checks out sources, builds every version, writes the index.

use crate::config::{Config, VersionConfig};
use crate::git::GitCheckout;
use crate::markdown::MarkdownRenderer;
use crate::version::{VersionBuild, VersionBuilder, VersionSource, VersionStats};
use jepsite_render::{RenderError, SiteIndexTemplate};
use jepsite_types::{VersionIndex, VersionManifest};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

pub const VERSIONS_FILE: &str = "versions.json";
pub const SITE_INDEX_FILE: &str = "index.html";

/// Ref checked out for versions that name none
const DEFAULT_REF: &str = "HEAD";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Output path exists and is not a directory: {0:?}")]
    OutputConflict(PathBuf),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize version index: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Outcome of one configured version
#[derive(Debug, Clone, Serialize)]
pub struct VersionReport {
    pub id: String,
    pub label: String,
    pub pages: usize,
    pub searchable: usize,
    pub failed: usize,
    /// Why the version was skipped, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl VersionReport {
    fn built(version: &VersionConfig, stats: VersionStats) -> Self {
        Self {
            id: version.id.clone(),
            label: version.label().to_string(),
            pages: stats.pages,
            searchable: stats.searchable,
            failed: stats.failed,
            skipped: None,
        }
    }

    fn skipped(version: &VersionConfig, reason: String) -> Self {
        Self {
            id: version.id.clone(),
            label: version.label().to_string(),
            pages: 0,
            searchable: 0,
            failed: 0,
            skipped: Some(reason),
        }
    }
}

/// Summary returned by [`SiteBuilder::build`]
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub versions: Vec<VersionReport>,
    pub default_version_id: Option<String>,
}

impl SiteReport {
    pub fn built_count(&self) -> usize {
        self.versions.iter().filter(|v| v.skipped.is_none()).count()
    }

    pub fn failed_files(&self) -> usize {
        self.versions.iter().map(|v| v.failed).sum()
    }
}

/// Main site builder
pub struct SiteBuilder {
    config: Config,
    renderer: MarkdownRenderer,
}

impl SiteBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            renderer: MarkdownRenderer::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build every configured version
    ///
    /// A failing version is logged and skipped. Only problems with the
    /// output root itself abort the build.
    pub async fn build(&self) -> Result<SiteReport, BuildError> {
        let output_dir = self.config.output_dir();
        prepare_output_dir(&output_dir).await?;

        let checkout = self.prepare_checkout().await;
        let builder = VersionBuilder::new(&self.renderer, &self.config.site.title, &output_dir);

        let mut manifests: Vec<VersionManifest> = Vec::new();
        let mut reports = Vec::new();

        for version in &self.config.versions {
            match self.build_one(&builder, checkout.as_ref(), version).await {
                Ok(build) => {
                    reports.push(VersionReport::built(version, build.stats));
                    manifests.push(build.manifest);
                }
                Err(reason) => {
                    error!(version = %version.id, error = %reason, "Skipping version");
                    reports.push(VersionReport::skipped(version, reason));
                }
            }
        }

        let default_version_id = self.pick_default_version(&manifests);
        let index = VersionIndex {
            versions: manifests,
            default_version_id: default_version_id.clone(),
        };

        let versions_path = output_dir.join(VERSIONS_FILE);
        write_file(&versions_path, serde_json::to_string_pretty(&index)?).await?;

        let base_url = self.config.normalized_base_url();
        let landing = SiteIndexTemplate::from_index(&self.config.site.title, &base_url, &index)
            .render_page()?;
        write_file(&output_dir.join(SITE_INDEX_FILE), landing).await?;

        let report = SiteReport {
            versions: reports,
            default_version_id,
        };
        info!(
            built = report.built_count(),
            configured = self.config.versions.len(),
            failed_files = report.failed_files(),
            "Site build complete"
        );
        Ok(report)
    }

    /// Clone or refresh the repository
    ///
    /// `None` without a repository; `Some(Err)` when cloning or fetching failed.
    async fn prepare_checkout(&self) -> Option<Result<GitCheckout, String>> {
        let repository = self.config.repository.as_ref()?;
        let checkout = GitCheckout::new(&repository.url, self.config.checkout_dir());
        Some(match checkout.init_or_refresh().await {
            Ok(()) => Ok(checkout),
            Err(e) => {
                error!(repo = %repository.url, error = %e, "Failed to prepare repository");
                Err(e.to_string())
            }
        })
    }

    async fn build_one(
        &self,
        builder: &VersionBuilder<'_>,
        checkout: Option<&Result<GitCheckout, String>>,
        version: &VersionConfig,
    ) -> Result<VersionBuild, String> {
        if let Some(checkout) = checkout {
            let checkout = checkout
                .as_ref()
                .map_err(|e| format!("repository unavailable: {}", e))?;
            let git_ref = version.git_ref.as_deref().unwrap_or(DEFAULT_REF);
            checkout
                .checkout(git_ref)
                .await
                .map_err(|e| e.to_string())?;
        }

        let source = VersionSource {
            id: version.id.clone(),
            label: version.label().to_string(),
            spec_root: self.config.source_root(version),
            local_root: self.config.local_docs_root(version),
            include_globs: self.config.include_globs_for(version).to_vec(),
            exclude_globs: self.config.exclude_globs_for(version).to_vec(),
        };
        builder.build(&source).await.map_err(|e| e.to_string())
    }

    /// Configured default if it was built, otherwise the first built version
    fn pick_default_version(&self, manifests: &[VersionManifest]) -> Option<String> {
        if let Some(wanted) = &self.config.default_version {
            if manifests.iter().any(|m| &m.id == wanted) {
                return Some(wanted.clone());
            }
            warn!(version = %wanted, "Default version was not built, falling back");
        }
        manifests.first().map(|m| m.id.clone())
    }
}

async fn prepare_output_dir(path: &Path) -> Result<(), BuildError> {
    if path.exists() && !path.is_dir() {
        return Err(BuildError::OutputConflict(path.to_path_buf()));
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_file(path: &Path, contents: String) -> Result<(), BuildError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        })
}
