//! Build command implementation.

use anyhow::{bail, Context, Result};
use include_dir::{include_dir, Dir};
use jepsite_core::{Config, SiteBuilder, SiteReport};
use std::fs;
use std::path::Path;

// Embed the client script and stylesheet so they ship with the binary
static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../static");

/// Build every configured version and install the client assets
pub async fn build_site(config_path: &Path) -> Result<()> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let output_dir = config.output_dir();

    tracing::info!("Building site: {}", config.site.title);

    let report = SiteBuilder::new(config)
        .build()
        .await
        .context("Failed to build site")?;

    extract_embedded_static(&output_dir)?;
    print_report(&report);

    if report.built_count() == 0 {
        bail!("No version could be built");
    }
    Ok(())
}

fn print_report(report: &SiteReport) {
    for version in &report.versions {
        match &version.skipped {
            Some(reason) => println!("{}: skipped ({})", version.id, reason),
            None => println!(
                "{}: {} pages, {} searchable, {} failed",
                version.id, version.pages, version.searchable, version.failed
            ),
        }
    }
    if let Some(default) = &report.default_version_id {
        println!("default version: {}", default);
    }
}

fn extract_embedded_static(dest: &Path) -> Result<()> {
    for entry in STATIC_ASSETS.entries() {
        extract_entry(entry, dest)?;
    }
    Ok(())
}

fn extract_entry(entry: &include_dir::DirEntry, dest: &Path) -> Result<()> {
    match entry {
        include_dir::DirEntry::Dir(dir) => {
            for sub_entry in dir.entries() {
                extract_entry(sub_entry, dest)?;
            }
        }
        include_dir::DirEntry::File(file) => {
            let target = dest.join(file.path());
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, file.contents())
                .with_context(|| format!("Failed to write embedded static file to {:?}", target))?;
        }
    }
    Ok(())
}
