//! Where category trees come from: static configuration, or derived from the
//! tag frequencies of the content store.

use std::collections::HashMap;

use super::{CategoryNode, CategoryTree};
use crate::content::{ContentLookup, ContentRef};

pub trait CategorySource {
    fn categories(&self) -> CategoryTree;
}

/// A fixed tree, typically loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticCategories(pub CategoryTree);

impl CategorySource for StaticCategories {
    fn categories(&self) -> CategoryTree {
        self.0.clone()
    }
}

/// Derives categories from content tags: the most frequent tags become
/// top-level categories and the tags that co-occur with each become children.
pub struct TagFrequencySource<'a, L: ContentLookup> {
    pub lookup: &'a L,
    pub max_top_level: usize,
    pub max_children: usize,
}

impl<'a, L: ContentLookup> TagFrequencySource<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            max_top_level: 8,
            max_children: 5,
        }
    }
}

impl<L: ContentLookup> CategorySource for TagFrequencySource<'_, L> {
    fn categories(&self) -> CategoryTree {
        derive_from_tags(&self.lookup.all(), self.max_top_level, self.max_children)
    }
}

/// Tag frequencies in descending order. Ties keep first-appearance order.
pub fn tag_frequencies(items: &[&ContentRef]) -> Vec<(String, u32)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u32> = HashMap::new();
    for item in items {
        for tag in &item.tags {
            let entry = counts.entry(tag.clone()).or_insert(0);
            if *entry == 0 {
                order.push(tag.clone());
            }
            *entry += 1;
        }
    }
    let mut ranked: Vec<(String, u32)> = order
        .into_iter()
        .map(|tag| {
            let n = counts.get(&tag).copied().unwrap_or(0);
            (tag, n)
        })
        .collect();
    // sort_by is stable, so equal counts stay in appearance order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Tag text as an id segment. `-` separates segments, so it is escaped
/// (along with the escape character) to keep derived ids unique.
fn id_segment(tag: &str) -> String {
    tag.replace('%', "%25").replace('-', "%2D")
}

pub fn derive_from_tags(items: &[ContentRef], max_top_level: usize, max_children: usize) -> CategoryTree {
    let all: Vec<&ContentRef> = items.iter().collect();
    let top = tag_frequencies(&all);

    let roots = top
        .into_iter()
        .take(max_top_level)
        .map(|(tag, count)| {
            let tagged: Vec<&ContentRef> = items.iter().filter(|c| c.has_tag(&tag)).collect();
            let children = tag_frequencies(&tagged)
                .into_iter()
                .filter(|(other, _)| other != &tag)
                .take(max_children)
                .map(|(other, n)| {
                    CategoryNode::new(format!("tag-{}-{}", id_segment(&tag), id_segment(&other)), other, n)
                })
                .collect();
            CategoryNode::new(format!("tag-{}", id_segment(&tag)), tag, count).with_children(children)
        })
        .collect();

    CategoryTree::new(roots)
}
