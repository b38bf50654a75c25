//! Client-side search index for one version.
//!
//! [`SearchIndexBuilder`] owns the document id counter, the full-text index
//! and the id -> metadata map while a version is being built. Ids are handed
//! out in contiguous blocks so a batch of files can be processed concurrently
//! and still receive ids by position.

use crate::models::SearchIndexEntry;
use jepsite_types::{DocId, SearchDocMeta};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

/// Indexed document fields, in export order
pub const INDEXED_FIELDS: [&str; 3] = ["title", "content", "sectionsText"];

/// Longest token prefix stored; longer tokens are indexed up to this length
const MAX_TOKEN_CHARS: usize = 32;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Missing index segment: {0}")]
    MissingSegment(String),

    #[error("Malformed index segment {key}: {source}")]
    MalformedSegment {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported tokenizer: {0}")]
    UnsupportedTokenizer(String),
}

/// Index configuration, exported as the `cfg` segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub tokenize: String,
    pub fields: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            tokenize: "forward".to_string(),
            fields: INDEXED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Lower-cased word tokens of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Every leading prefix of `token`, shortest first
fn forward_prefixes(token: &str) -> impl Iterator<Item = &str> {
    token
        .char_indices()
        .skip(1)
        .map(|(idx, _)| idx)
        .chain(std::iter::once(token.len()))
        .take(MAX_TOKEN_CHARS)
        .map(move |end| &token[..end])
}

/// Inverted index over the three searchable fields with forward tokenization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchIndex {
    config: IndexConfig,
    registered: BTreeSet<DocId>,
    /// field -> token prefix -> documents
    fields: BTreeMap<String, BTreeMap<String, BTreeSet<DocId>>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.registered.contains(&id)
    }

    /// Index an entry's title, content and section text under its id
    pub fn add(&mut self, entry: &SearchIndexEntry) {
        self.registered.insert(entry.id);
        let values = [
            entry.title.as_str(),
            entry.content.as_str(),
            entry.sections_text.as_str(),
        ];
        for (field, value) in INDEXED_FIELDS.iter().zip(values) {
            let map = self.fields.entry(field.to_string()).or_default();
            for token in tokenize(value) {
                for prefix in forward_prefixes(&token) {
                    map.entry(prefix.to_string()).or_default().insert(entry.id);
                }
            }
        }
    }

    /// Documents matching every query token in at least one field
    ///
    /// Results are ranked by field weight (title, then sections, then
    /// content) and then by id.
    pub fn search(&self, query: &str, limit: usize) -> Vec<DocId> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<DocId, u32> = HashMap::new();
        let mut matched: Option<BTreeSet<DocId>> = None;

        for token in &tokens {
            let key: String = token.chars().take(MAX_TOKEN_CHARS).collect();
            let mut token_docs = BTreeSet::new();
            for (field, weight) in [("title", 3), ("sectionsText", 2), ("content", 1)] {
                let Some(docs) = self.fields.get(field).and_then(|m| m.get(&key)) else {
                    continue;
                };
                for id in docs {
                    *scores.entry(*id).or_default() += weight;
                    token_docs.insert(*id);
                }
            }
            matched = Some(match matched {
                Some(prev) => prev.intersection(&token_docs).copied().collect(),
                None => token_docs,
            });
        }

        let mut results: Vec<DocId> = matched.unwrap_or_default().into_iter().collect();
        results.sort_by(|a, b| {
            scores
                .get(b)
                .cmp(&scores.get(a))
                .then_with(|| a.cmp(b))
        });
        results.truncate(limit);
        results
    }

    /// Serialize the index into named segments
    ///
    /// Each value is a compact JSON blob. Segments with no data are omitted.
    pub fn export(&self) -> BTreeMap<String, String> {
        let mut segments = BTreeMap::new();

        if let Ok(cfg) = serde_json::to_string(&self.config) {
            segments.insert("cfg".to_string(), cfg);
        }
        if !self.registered.is_empty() {
            if let Ok(reg) = serde_json::to_string(&self.registered) {
                segments.insert("reg".to_string(), reg);
            }
        }
        for (field, map) in &self.fields {
            if map.is_empty() {
                continue;
            }
            if let Ok(blob) = serde_json::to_string(map) {
                segments.insert(format!("{}.map", field), blob);
            }
        }

        segments
    }

    /// Rebuild an index from exported segments
    pub fn import(segments: &BTreeMap<String, String>) -> Result<Self, SearchError> {
        let cfg_blob = segments
            .get("cfg")
            .ok_or_else(|| SearchError::MissingSegment("cfg".to_string()))?;
        let config: IndexConfig = parse_segment("cfg", cfg_blob)?;
        if config.tokenize != "forward" {
            return Err(SearchError::UnsupportedTokenizer(config.tokenize));
        }

        let registered = match segments.get("reg") {
            Some(blob) => parse_segment("reg", blob)?,
            None => BTreeSet::new(),
        };

        let mut fields = BTreeMap::new();
        for field in &config.fields {
            let key = format!("{}.map", field);
            if let Some(blob) = segments.get(&key) {
                fields.insert(field.clone(), parse_segment(&key, blob)?);
            }
        }

        Ok(Self {
            config,
            registered,
            fields,
        })
    }
}

fn parse_segment<T: serde::de::DeserializeOwned>(key: &str, blob: &str) -> Result<T, SearchError> {
    serde_json::from_str(blob).map_err(|source| SearchError::MalformedSegment {
        key: key.to_string(),
        source,
    })
}

/// A contiguous block of reserved document ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdBlock {
    range: Range<u32>,
}

impl IdBlock {
    pub fn base(&self) -> u32 {
        self.range.start
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Id for the file at `local_index` within the batch
    pub fn claim(&self, local_index: usize) -> Option<DocId> {
        let offset = u32::try_from(local_index).ok()?;
        let id = self.range.start.checked_add(offset)?;
        self.range.contains(&id).then_some(DocId(id))
    }
}

/// Exported search artifacts for one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchExport {
    /// Segment name -> compact JSON blob (`search_index.json`)
    pub index: BTreeMap<String, String>,
    /// Document id -> metadata (`search_map.json`)
    pub doc_map: BTreeMap<DocId, SearchDocMeta>,
}

impl SearchExport {
    pub fn index_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.index)
    }

    pub fn doc_map_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.doc_map)
    }
}

/// Accumulates one version's search index and document map
#[derive(Debug, Default)]
pub struct SearchIndexBuilder {
    next_id: u32,
    index: SearchIndex,
    doc_map: BTreeMap<DocId, SearchDocMeta>,
}

impl SearchIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder whose first reserved id is `first_id`
    pub fn starting_at(first_id: u32) -> Self {
        Self {
            next_id: first_id,
            ..Self::default()
        }
    }

    /// The id the next reservation will start at
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Reserve `count` consecutive ids; they are never handed out again
    pub fn reserve(&mut self, count: usize) -> IdBlock {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        let start = self.next_id;
        let end = start.saturating_add(count);
        self.next_id = end;
        IdBlock { range: start..end }
    }

    pub fn add(&mut self, entry: &SearchIndexEntry) {
        self.index.add(entry);
    }

    pub fn set_doc(&mut self, id: DocId, meta: SearchDocMeta) {
        self.doc_map.insert(id, meta);
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn doc_map(&self) -> &BTreeMap<DocId, SearchDocMeta> {
        &self.doc_map
    }

    pub fn export(&self) -> SearchExport {
        SearchExport {
            index: self.index.export(),
            doc_map: self.doc_map.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, title: &str, content: &str, sections: &str) -> SearchIndexEntry {
        SearchIndexEntry {
            id: DocId(id),
            title: title.to_string(),
            content: content.to_string(),
            sections_text: sections.to_string(),
            is_obsoleted: false,
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Filter Projections: foo[?bar > `1`]"),
            vec!["filter", "projections", "foo", "bar", "1"]
        );
    }

    #[test]
    fn test_forward_prefixes() {
        let prefixes: Vec<&str> = forward_prefixes("slice").collect();
        assert_eq!(prefixes, vec!["s", "sl", "sli", "slic", "slice"]);
        let unicode: Vec<&str> = forward_prefixes("été").collect();
        assert_eq!(unicode, vec!["é", "ét", "été"]);
    }

    #[test]
    fn test_prefix_search() {
        let mut index = SearchIndex::new();
        index.add(&entry(0, "Array Slicing", "Slices select ranges.", "Syntax Examples"));
        index.add(&entry(1, "Functions", "abs avg ceil", "Built-in functions"));

        assert_eq!(index.search("slic", 10), vec![DocId(0)]);
        assert_eq!(index.search("func", 10), vec![DocId(1)]);
        assert_eq!(index.search("examples", 10), vec![DocId(0)]);
        assert!(index.search("nothing", 10).is_empty());
        assert!(index.search("   ", 10).is_empty());
    }

    #[test]
    fn test_all_tokens_must_match() {
        let mut index = SearchIndex::new();
        index.add(&entry(0, "Pipe", "pipe expressions", ""));
        index.add(&entry(1, "Slices", "slice expressions", ""));
        assert_eq!(index.search("slice expr", 10), vec![DocId(1)]);
    }

    #[test]
    fn test_title_matches_rank_first() {
        let mut index = SearchIndex::new();
        index.add(&entry(0, "Grammar", "mentions projections once", ""));
        index.add(&entry(1, "Projections", "details", ""));
        assert_eq!(index.search("projections", 10), vec![DocId(1), DocId(0)]);
        assert_eq!(index.search("projections", 1), vec![DocId(1)]);
    }

    #[test]
    fn test_reserve_is_contiguous_and_never_reused() {
        let mut builder = SearchIndexBuilder::starting_at(10);
        let first = builder.reserve(2);
        let second = builder.reserve(3);
        let empty = builder.reserve(0);

        assert_eq!(first.base(), 10);
        assert_eq!(first.len(), 2);
        assert_eq!(second.base(), 12);
        assert_eq!(second.len(), 3);
        assert!(empty.is_empty());
        assert_eq!(builder.next_id(), 15);
    }

    #[test]
    fn test_claim_by_position() {
        let mut builder = SearchIndexBuilder::starting_at(10);
        let block = builder.reserve(2);
        assert_eq!(block.claim(1), Some(DocId(11)));
        assert_eq!(block.claim(0), Some(DocId(10)));
        assert_eq!(block.claim(2), None);
    }

    #[test]
    fn test_export_omits_empty_segments() {
        let builder = SearchIndexBuilder::new();
        let export = builder.export();
        assert_eq!(export.index.keys().collect::<Vec<_>>(), vec!["cfg"]);
        assert_eq!(export.doc_map_json().unwrap(), "{}");
    }

    #[test]
    fn test_export_import() {
        let mut builder = SearchIndexBuilder::new();
        let block = builder.reserve(1);
        let id = block.claim(0).unwrap();
        builder.add(&entry(id.0, "Let Expressions", "lexical scope", "Motivation"));
        builder.set_doc(
            id,
            SearchDocMeta {
                title: "Let Expressions".into(),
                href: "jeps/let.html".into(),
                sections: vec![],
                is_obsoleted: false,
            },
        );

        let export = builder.export();
        assert!(export.index.contains_key("reg"));
        assert!(export.index.contains_key("title.map"));
        assert!(export.index.contains_key("content.map"));
        assert!(export.index.contains_key("sectionsText.map"));

        let restored = SearchIndex::import(&export.index).unwrap();
        assert_eq!(&restored, builder.index());
        assert_eq!(restored.search("lex", 5), vec![DocId(0)]);

        let map_json = export.doc_map_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&map_json).unwrap();
        assert_eq!(value["0"]["href"], "jeps/let.html");
        assert_eq!(value["0"]["isObsoleted"], false);
    }

    #[test]
    fn test_import_rejects_missing_config() {
        let segments = BTreeMap::new();
        assert!(matches!(
            SearchIndex::import(&segments),
            Err(SearchError::MissingSegment(_))
        ));
    }
}
