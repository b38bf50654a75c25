//! Version and site builds over temporary source trees.

use jepsite_core::{Config, MarkdownRenderer, SiteBuilder, VersionBuilder, VersionSource};
use jepsite_types::{DocId, VersionIndex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn source(id: &str, spec_root: &Path, local_root: Option<&Path>) -> VersionSource {
    VersionSource {
        id: id.to_string(),
        label: id.to_uppercase(),
        spec_root: spec_root.to_path_buf(),
        local_root: local_root.map(Path::to_path_buf),
        include_globs: vec!["**/*.md".to_string()],
        exclude_globs: vec![],
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn spec_tree(root: &Path) {
    write(
        root,
        "spec.md",
        "---\ntitle: Specification\nnav_order: 1\n---\n# Spec\n\n## Grammar\n\nThe grammar.\n",
    );
    write(
        root,
        "jeps/jep-011-let.md",
        "---\ntitle: Lexical Scoping\nparent: jeps\nnav_order: 11\nstatus: accepted\n---\n# Let\n\n```jmespath-interactive expanded Let demo\n{\"a\": 1}\n---JMESPATH---\nlet $x = a in $x\n```\n",
    );
    write(
        root,
        "jeps/jep-003-old.md",
        "---\ntitle: Old Functions\nstatus: Obsoleted\nobsoleted_by: jep-011\n---\n# Old\n\nLegacy text.\n",
    );
    write(root, "array-slicing.md", "Slices pick ranges.\n");
}

#[tokio::test]
async fn test_builds_pages_search_and_manifest() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    spec_tree(src.path());

    let renderer = MarkdownRenderer::new();
    let builder = VersionBuilder::new(&renderer, "JMESPath", out.path());
    let build = builder.build(&source("latest", src.path(), None)).await.unwrap();

    assert_eq!(build.stats.failed, 0);
    assert_eq!(build.stats.searchable, 4);
    assert_eq!(build.stats.pages, 3);

    let manifest = &build.manifest;
    assert_eq!(manifest.id, "latest");
    assert_eq!(manifest.label, "LATEST");
    assert_eq!(manifest.default_file, "spec.html");

    // Parentless pages first, then by nav_order, then title
    let files: Vec<&str> = manifest.pages.iter().map(|p| p.file.as_str()).collect();
    assert_eq!(
        files,
        vec!["spec.html", "array-slicing.html", "jeps/jep-011-let.html"]
    );
    let fallback = &manifest.pages[1];
    assert_eq!(fallback.title, "Array Slicing");
    assert_eq!(fallback.id, "array-slicing");

    let version_dir = out.path().join("latest");
    let page = fs::read_to_string(version_dir.join("jeps/jep-011-let.html")).unwrap();
    assert!(page.contains("data-version=\"latest\""));
    assert!(page.contains("data-page-id=\"jeps/jep-011-let\""));
    assert!(page.contains("class=\"jmespath-playground\""));
    assert!(page.contains("src=\"../../app.js\""));
    assert!(version_dir.join("jeps/jep-003-old.html").is_file());

    let search_map = read_json(&version_dir.join("search_map.json"));
    let map = search_map.as_object().unwrap();
    assert_eq!(map.len(), 4);
    let old = map
        .values()
        .find(|m| m["href"] == "jeps/jep-003-old.html")
        .unwrap();
    assert_eq!(old["isObsoleted"], true);
    assert!(!manifest.pages.iter().any(|p| p.file == "jeps/jep-003-old.html"));

    let spec = map.values().find(|m| m["href"] == "spec.html").unwrap();
    assert_eq!(spec["sections"][0]["id"], "grammar");
    assert_eq!(spec["sections"][0]["level"], 2);

    let index_json = fs::read_to_string(version_dir.join("search_index.json")).unwrap();
    assert!(!index_json.contains('\n'));
    let segments: BTreeMap<String, String> = serde_json::from_str(&index_json).unwrap();
    let index = jepsite_core::SearchIndex::import(&segments).unwrap();
    assert_eq!(index.len(), 4);
    let hits = index.search("legacy", 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(map[&hits[0].to_string()]["title"], "Old Functions");

    // Playground chrome never reaches the search text
    assert!(index.search("interactive", 10).is_empty());
}

#[tokio::test]
async fn test_doc_ids_follow_sorted_positions() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(src.path(), "b.md", "# Bee\n");
    write(src.path(), "a.md", "# Ay\n");

    let renderer = MarkdownRenderer::new();
    let builder = VersionBuilder::new(&renderer, "Site", out.path());
    builder.build(&source("v", src.path(), None)).await.unwrap();

    let search_map = read_json(&out.path().join("v/search_map.json"));
    assert_eq!(search_map["0"]["href"], "a.html");
    assert_eq!(search_map["1"]["href"], "b.html");
}

#[test]
fn test_batch_reservation_starting_at_ten() {
    let mut search = jepsite_core::SearchIndexBuilder::starting_at(10);
    let block = search.reserve(2);
    let ids: Vec<DocId> = (0..2).rev().filter_map(|i| block.claim(i)).collect();
    assert_eq!(ids, vec![DocId(11), DocId(10)]);
    assert_eq!(search.next_id(), 12);
}

#[tokio::test]
async fn test_local_docs_override_and_follow_spec_ids() {
    let src = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(src.path(), "grammar.md", "# Grammar\n");
    write(src.path(), "spec.md", "# Upstream Spec\n");
    write(local.path(), "spec.md", "# Local Spec\n");
    write(local.path(), "about.md", "# About\n");

    let renderer = MarkdownRenderer::new();
    let builder = VersionBuilder::new(&renderer, "Site", out.path());
    let build = builder
        .build(&source("v", src.path(), Some(local.path())))
        .await
        .unwrap();

    assert_eq!(build.stats.searchable, 3);
    let spec_page = fs::read_to_string(out.path().join("v/spec.html")).unwrap();
    assert!(spec_page.contains("Local Spec"));
    assert!(!spec_page.contains("Upstream Spec"));

    // Spec files take the first ids, local files follow
    let search_map = read_json(&out.path().join("v/search_map.json"));
    assert_eq!(search_map["0"]["href"], "grammar.html");
    assert_eq!(search_map["1"]["href"], "about.html");
    assert_eq!(search_map["2"]["href"], "spec.html");
    assert_eq!(search_map["2"]["title"], "Local Spec");
}

#[tokio::test]
async fn test_empty_include_globs_discover_nothing() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(src.path(), "spec.md", "# Spec\n");

    let mut version = source("v", src.path(), None);
    version.include_globs.clear();

    let renderer = MarkdownRenderer::new();
    let builder = VersionBuilder::new(&renderer, "Site", out.path());
    let build = builder.build(&version).await.unwrap();

    assert!(build.manifest.pages.is_empty());
    assert_eq!(build.manifest.default_file, "_index.html");
    assert_eq!(build.stats.searchable, 0);
    assert_eq!(
        read_json(&out.path().join("v/search_map.json")),
        serde_json::json!({})
    );
}

#[tokio::test]
async fn test_unreadable_file_is_isolated() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(src.path(), "good.md", "# Good\n");
    fs::write(src.path().join("bad.md"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

    let renderer = MarkdownRenderer::new();
    let builder = VersionBuilder::new(&renderer, "Site", out.path());
    let build = builder.build(&source("v", src.path(), None)).await.unwrap();

    assert_eq!(build.stats.failed, 1);
    assert_eq!(build.stats.searchable, 1);
    assert_eq!(build.manifest.pages.len(), 1);
    assert_eq!(build.manifest.pages[0].file, "good.html");

    // The failed file keeps its reserved id; nothing else takes it
    let search_map = read_json(&out.path().join("v/search_map.json"));
    assert!(search_map.get("0").is_none());
    assert_eq!(search_map["1"]["href"], "good.html");
}

#[cfg(unix)]
#[tokio::test]
async fn test_dangling_symlink_does_not_skip_version() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(src.path(), "spec.md", "# Spec\n");
    write(src.path(), "grammar.md", "# Grammar\n");
    std::os::unix::fs::symlink(src.path().join("gone.md"), src.path().join("link.md")).unwrap();

    let renderer = MarkdownRenderer::new();
    let builder = VersionBuilder::new(&renderer, "Site", out.path());
    let build = builder.build(&source("v", src.path(), None)).await.unwrap();

    assert_eq!(build.stats.failed, 0);
    let files: Vec<&str> = build
        .manifest
        .pages
        .iter()
        .map(|p| p.file.as_str())
        .collect();
    assert_eq!(files, vec!["grammar.html", "spec.html"]);
}

#[tokio::test]
async fn test_missing_source_root_fails_version() {
    let out = tempfile::tempdir().unwrap();
    let renderer = MarkdownRenderer::new();
    let builder = VersionBuilder::new(&renderer, "Site", out.path());
    let result = builder
        .build(&source("v", &out.path().join("absent"), None))
        .await;
    assert!(matches!(
        result,
        Err(jepsite_core::VersionError::MissingSource(_))
    ));
}

#[tokio::test]
async fn test_rebuild_is_stable() {
    let src = tempfile::tempdir().unwrap();
    spec_tree(src.path());
    let renderer = MarkdownRenderer::new();

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let out = tempfile::tempdir().unwrap();
        let builder = VersionBuilder::new(&renderer, "Site", out.path());
        let build = builder.build(&source("v", src.path(), None)).await.unwrap();
        let index = fs::read_to_string(out.path().join("v/search_index.json")).unwrap();
        outputs.push((build.manifest, index));
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_site_build_skips_failed_versions() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "spec/v2/spec.md", "# Spec v2\n");
    let config_path = root.path().join("jepsite.yml");
    fs::write(
        &config_path,
        r#"
site:
  title: JMESPath
  base_url: docs
paths:
  output: out
default_version: v1
versions:
  - id: v1
    sub_path: spec/v1
  - id: v2
    label: Version 2
    sub_path: spec/v2
"#,
    )
    .unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let report = SiteBuilder::new(config).build().await.unwrap();

    assert_eq!(report.built_count(), 1);
    assert!(report.versions[0].skipped.is_some());
    assert_eq!(report.default_version_id.as_deref(), Some("v2"));

    let out = root.path().join("out");
    let index: VersionIndex =
        serde_json::from_str(&fs::read_to_string(out.join("versions.json")).unwrap()).unwrap();
    assert_eq!(index.versions.len(), 1);
    assert_eq!(index.default_version_id.as_deref(), Some("v2"));
    assert_eq!(index.versions[0].label, "Version 2");
    assert_eq!(index.versions[0].default_file, "spec.html");

    let landing = fs::read_to_string(out.join("index.html")).unwrap();
    assert!(landing.contains("url=/docs/v2/spec.html"));
    assert!(landing.contains("href=\"/docs/style.css\""));
    assert!(out.join("v2/spec.html").is_file());
}
