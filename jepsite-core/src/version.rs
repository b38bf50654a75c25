//! Build of one documentation version.
//!
//! Files from the spec source and the local override root are processed in
//! two batches. Within a batch every file runs concurrently on the current
//! task; the search index is only touched after the whole batch settles.

use crate::analyze::analyze_html;
use crate::discover::{discover_files, DiscoverError, GlobFilter};
use crate::frontmatter::extract_document;
use crate::git::GitError;
use crate::markdown::MarkdownRenderer;
use crate::models::DocumentRecords;
use crate::navigation::{select_default_file, sort_pages};
use crate::records::{build_records, default_nav_id, output_path};
use crate::search::SearchIndexBuilder;
use futures::future::join_all;
use jepsite_render::{root_prefix, PageTemplate, RenderError};
use jepsite_types::{DocId, NavPage, VersionManifest};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const SEARCH_INDEX_FILE: &str = "search_index.json";
pub const SEARCH_MAP_FILE: &str = "search_map.json";

/// Failure confined to a single source file
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render page shell: {0}")]
    Render(#[from] RenderError),
}

/// Failure that skips a whole version
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Source root does not exist: {0:?}")]
    MissingSource(PathBuf),

    #[error("File discovery failed: {0}")]
    Discover(#[from] DiscoverError),

    #[error("Git checkout failed: {0}")]
    Git(#[from] GitError),

    #[error("Failed to create version directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize search data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path:?}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where one version's sources live and how files are selected
#[derive(Debug, Clone)]
pub struct VersionSource {
    pub id: String,
    pub label: String,
    pub spec_root: PathBuf,
    pub local_root: Option<PathBuf>,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
}

/// Counts for the build report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionStats {
    /// Files turned into search records
    pub searchable: usize,
    /// Navigation entries in the manifest
    pub pages: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct VersionBuild {
    pub manifest: VersionManifest,
    pub stats: VersionStats,
}

/// Shared inputs for building versions into one output root
pub struct VersionBuilder<'a> {
    renderer: &'a MarkdownRenderer,
    site_title: &'a str,
    output_root: &'a Path,
}

/// One file's identity within a batch
struct FileJob<'a> {
    root: &'a Path,
    rel_path: &'a str,
    doc_id: DocId,
}

impl<'a> VersionBuilder<'a> {
    pub fn new(renderer: &'a MarkdownRenderer, site_title: &'a str, output_root: &'a Path) -> Self {
        Self {
            renderer,
            site_title,
            output_root,
        }
    }

    /// Build a version directory and return its manifest
    pub async fn build(&self, source: &VersionSource) -> Result<VersionBuild, VersionError> {
        if !source.spec_root.is_dir() {
            return Err(VersionError::MissingSource(source.spec_root.clone()));
        }
        let filter = GlobFilter::new(&source.include_globs, &source.exclude_globs)?;

        let local_files = match &source.local_root {
            Some(root) if root.is_dir() => discover_files(root, &filter)?,
            Some(root) => {
                warn!(
                    version = %source.id,
                    root = %root.display(),
                    "Local docs root not found, skipping"
                );
                Vec::new()
            }
            None => Vec::new(),
        };
        let spec_files =
            without_overridden(discover_files(&source.spec_root, &filter)?, &local_files);
        debug!(
            version = %source.id,
            spec = spec_files.len(),
            local = local_files.len(),
            "Discovered source files"
        );

        let version_dir = self.output_root.join(&source.id);
        tokio::fs::create_dir_all(&version_dir)
            .await
            .map_err(|source| VersionError::CreateDir {
                path: version_dir.clone(),
                source,
            })?;

        let mut search = SearchIndexBuilder::new();
        let mut pages = Vec::new();
        let mut stats = VersionStats::default();

        self.run_batch(
            source,
            &version_dir,
            &source.spec_root,
            &spec_files,
            &mut search,
            &mut pages,
            &mut stats,
        )
        .await;
        if let Some(local_root) = &source.local_root {
            self.run_batch(
                source,
                &version_dir,
                local_root,
                &local_files,
                &mut search,
                &mut pages,
                &mut stats,
            )
            .await;
        }

        sort_pages(&mut pages);
        let default_file = select_default_file(&pages);
        stats.pages = pages.len();

        let export = search.export();
        write_export(&version_dir.join(SEARCH_INDEX_FILE), export.index_json()?).await?;
        write_export(&version_dir.join(SEARCH_MAP_FILE), export.doc_map_json()?).await?;

        info!(
            version = %source.id,
            pages = stats.pages,
            searchable = stats.searchable,
            failed = stats.failed,
            "Built version"
        );

        Ok(VersionBuild {
            manifest: VersionManifest {
                id: source.id.clone(),
                label: source.label.clone(),
                pages,
                default_file,
            },
            stats,
        })
    }

    /// Process a batch and fold the settled results into the index
    #[allow(clippy::too_many_arguments)]
    async fn run_batch(
        &self,
        source: &VersionSource,
        version_dir: &Path,
        root: &Path,
        files: &[String],
        search: &mut SearchIndexBuilder,
        pages: &mut Vec<NavPage>,
        stats: &mut VersionStats,
    ) {
        let ids = search.reserve(files.len());
        // The block is sized to the batch, so every position has an id
        let jobs = files.iter().enumerate().filter_map(|(position, rel_path)| {
            let doc_id = ids.claim(position)?;
            Some(self.process_file(
                source,
                version_dir,
                FileJob {
                    root,
                    rel_path,
                    doc_id,
                },
            ))
        });
        let results = join_all(jobs).await;

        for (rel_path, result) in files.iter().zip(results) {
            match result {
                Ok(records) => {
                    search.add(&records.search_entry);
                    search.set_doc(records.doc_id(), records.doc_meta);
                    pages.extend(records.nav_page);
                    stats.searchable += 1;
                }
                Err(e) => {
                    error!(
                        version = %source.id,
                        path = %rel_path,
                        error = %e,
                        "Failed to process file"
                    );
                    stats.failed += 1;
                }
            }
        }
    }

    /// Read, render, analyze and write one page
    async fn process_file(
        &self,
        source: &VersionSource,
        version_dir: &Path,
        job: FileJob<'_>,
    ) -> Result<DocumentRecords, FileError> {
        let input = job.root.join(job.rel_path);
        let content = tokio::fs::read_to_string(&input)
            .await
            .map_err(|source| FileError::Read {
                path: input.clone(),
                source,
            })?;

        let (records, page_html) = self.derive_records(&content, job.rel_path, job.doc_id);

        let output = version_dir.join(output_path(job.rel_path));
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FileError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let page = PageTemplate {
            title: records.doc_meta.title.clone(),
            site_title: self.site_title.to_string(),
            version_id: source.id.clone(),
            version_label: source.label.clone(),
            page_id: records
                .nav_page
                .as_ref()
                .map(|p| p.id.clone())
                .unwrap_or_else(|| default_nav_id(job.rel_path)),
            content: page_html,
            sections: records.doc_meta.sections.clone(),
            is_obsoleted: records.doc_meta.is_obsoleted,
            root_prefix: root_prefix(job.rel_path),
        }
        .render_page()?;

        tokio::fs::write(&output, page)
            .await
            .map_err(|source| FileError::Write {
                path: output.clone(),
                source,
            })?;

        Ok(records)
    }

    /// Synchronous part of file processing: text in, records and body HTML out
    fn derive_records(
        &self,
        content: &str,
        rel_path: &str,
        doc_id: DocId,
    ) -> (DocumentRecords, String) {
        let document = extract_document(content, rel_path);
        let html = self.renderer.render(&document.body);
        let analyzed = analyze_html(&html, &document.fallback_title, &document.body);
        let records = build_records(&document.front_matter, &analyzed, doc_id, rel_path);
        (records, html)
    }
}

/// Drop spec files whose output a local file also produces
fn without_overridden(spec_files: Vec<String>, local_files: &[String]) -> Vec<String> {
    let local_outputs: HashSet<String> = local_files.iter().map(|f| output_path(f)).collect();
    spec_files
        .into_iter()
        .filter(|f| {
            let shadowed = local_outputs.contains(&output_path(f));
            if shadowed {
                debug!(path = %f, "Spec file overridden by local docs");
            }
            !shadowed
        })
        .collect()
}

async fn write_export(path: &Path, contents: String) -> Result<(), VersionError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| VersionError::Export {
            path: path.to_path_buf(),
            source,
        })
}
