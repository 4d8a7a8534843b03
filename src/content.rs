//! Content references and the lookup seam to the materials store.
//!
//! The engine never owns content records. It stores `ContentRef` snapshots on
//! graph nodes and asks a `ContentLookup` when it needs to resolve ids or
//! search by tag.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of an externally owned content record (uploaded file, note, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl ContentRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            file_name: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Case-insensitive match on title, file name, or any tag.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&q)
            || self
                .file_name
                .as_ref()
                .map(|f| f.to_lowercase().contains(&q))
                .unwrap_or(false)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&q))
    }
}

/// Read-only access to the materials store.
pub trait ContentLookup {
    fn get(&self, id: &str) -> Option<ContentRef>;

    /// All records, in the store's stable order.
    fn all(&self) -> Vec<ContentRef>;

    fn tagged(&self, tag: &str) -> Vec<ContentRef> {
        self.all().into_iter().filter(|c| c.has_tag(tag)).collect()
    }
}

/// Search criteria used when generating a map from a flat content list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ItemQuery {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.tags.is_empty()
    }

    /// Free-text search wins over tag selection; selected tags must all be present.
    pub fn filter<'a>(&self, items: &'a [ContentRef]) -> Vec<&'a ContentRef> {
        let search = self.search.trim();
        if !search.is_empty() {
            items.iter().filter(|c| c.matches_query(search)).collect()
        } else if !self.tags.is_empty() {
            items
                .iter()
                .filter(|c| self.tags.iter().all(|t| c.has_tag(t)))
                .collect()
        } else {
            items.iter().collect()
        }
    }
}

/// In-memory materials store, loaded from JSON by the CLI and used in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContent {
    items: Vec<ContentRef>,
    index: HashMap<String, usize>,
}

impl InMemoryContent {
    pub fn new(items: Vec<ContentRef>) -> Self {
        let mut store = Self::default();
        for item in items {
            store.insert(item);
        }
        store
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let items: Vec<ContentRef> = serde_json::from_str(json)?;
        Ok(Self::new(items))
    }

    /// Insert or replace by id, keeping the original position on replace.
    pub fn insert(&mut self, item: ContentRef) {
        match self.index.get(&item.id) {
            Some(&i) => self.items[i] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ContentRef] {
        &self.items
    }
}

impl ContentLookup for InMemoryContent {
    fn get(&self, id: &str) -> Option<ContentRef> {
        self.index.get(id).map(|&i| self.items[i].clone())
    }

    fn all(&self) -> Vec<ContentRef> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ContentRef> {
        let mut pdf = ContentRef::new("m1", "Linear Algebra Notes", &["math", "algebra"]);
        pdf.file_name = Some("la-week3.pdf".to_string());
        vec![
            pdf,
            ContentRef::new("m2", "Graph Theory Intro", &["math", "cs"]),
            ContentRef::new("m3", "Rust Ownership", &["cs", "rust"]),
        ]
    }

    #[test]
    fn test_matches_query_title_file_and_tags() {
        let items = sample();
        assert!(items[0].matches_query("ALGEBRA"));
        assert!(items[0].matches_query("week3"));
        assert!(items[2].matches_query("rus"));
        assert!(!items[1].matches_query("biology"));
    }

    #[test]
    fn test_query_filter_search_beats_tags() {
        let items = sample();
        let q = ItemQuery {
            search: "ownership".to_string(),
            tags: vec!["math".to_string()],
        };
        let hits: Vec<&str> = q.filter(&items).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(hits, vec!["m3"]);
    }

    #[test]
    fn test_query_filter_requires_all_tags() {
        let items = sample();
        let q = ItemQuery {
            search: String::new(),
            tags: vec!["math".to_string(), "cs".to_string()],
        };
        let hits: Vec<&str> = q.filter(&items).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(hits, vec!["m2"]);
    }

    #[test]
    fn test_in_memory_replace_keeps_order() {
        let mut store = InMemoryContent::new(sample());
        store.insert(ContentRef::new("m1", "Renamed", &[]));
        assert_eq!(store.len(), 3);
        assert_eq!(store.items()[0].title, "Renamed");
        assert_eq!(store.get("m1").map(|c| c.title), Some("Renamed".to_string()));
        assert_eq!(store.tagged("cs").len(), 2);
    }
}
