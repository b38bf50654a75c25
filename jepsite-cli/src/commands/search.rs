//! Search command implementation

use anyhow::{anyhow, Context, Result};
use jepsite_core::search::SearchIndex;
use jepsite_core::version::{SEARCH_INDEX_FILE, SEARCH_MAP_FILE};
use jepsite_core::Config;
use jepsite_types::{DocId, SearchDocMeta, VersionIndex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub version: Option<String>,
    pub limit: usize,
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit<'a> {
    id: DocId,
    version: &'a str,
    title: &'a str,
    href: &'a str,
    is_obsoleted: bool,
}

/// Search one built version
pub fn search_site(config_path: &Path, query: &str, opts: SearchOptions) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let output_dir = config.output_dir();

    let versions_path = output_dir.join(jepsite_core::builder::VERSIONS_FILE);
    let versions_json = fs::read_to_string(&versions_path).with_context(|| {
        format!(
            "Version index not found at {:?}. Run `jepsite build` first.",
            versions_path
        )
    })?;
    let versions: VersionIndex =
        serde_json::from_str(&versions_json).context("Failed to parse version index")?;

    let version_id = opts
        .version
        .or(versions.default_version_id.clone())
        .ok_or_else(|| anyhow!("No version has been built"))?;
    if versions.find(&version_id).is_none() {
        return Err(anyhow!("Unknown version: {}", version_id));
    }

    let version_dir = output_dir.join(&version_id);
    let segments: BTreeMap<String, String> = read_json(&version_dir.join(SEARCH_INDEX_FILE))?;
    let doc_map: BTreeMap<DocId, SearchDocMeta> = read_json(&version_dir.join(SEARCH_MAP_FILE))?;
    let index = SearchIndex::import(&segments).context("Failed to load search index")?;

    let hits: Vec<SearchHit<'_>> = index
        .search(query, opts.limit)
        .into_iter()
        .filter_map(|id| {
            doc_map.get(&id).map(|meta| SearchHit {
                id,
                version: &version_id,
                title: &meta.title,
                href: &meta.href,
                is_obsoleted: meta.is_obsoleted,
            })
        })
        .collect();

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results found for '{}'", query);
        return Ok(());
    }

    for hit in &hits {
        let marker = if hit.is_obsoleted { " (obsoleted)" } else { "" };
        println!("{}  {}/{}{}", hit.title, version_id, hit.href, marker);
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))
}
