//! Tag-centred map over a flat content list.

use std::f64::consts::{FRAC_PI_4, TAU};

use super::constants::CONTENT_ARC;
use super::plan::{self, content_node, PlanNode, ROOT_ID};
use super::LayoutOptions;
use crate::category::source::tag_frequencies;
use crate::content::{ContentRef, ItemQuery};
use crate::graph::{Graph, NodeKind, Truncation};

pub(super) fn generate(items: &[ContentRef], query: &ItemQuery, options: &LayoutOptions) -> Graph {
    let matching = query.filter(items);
    let tags: Vec<(String, u32)> = tag_frequencies(&matching)
        .into_iter()
        .take(options.max_tags)
        .collect();

    let center = options.center;
    let mut root = PlanNode::root(options);
    root.label = root_label(query, &options.root_label);
    root.count = matching.len() as u32;
    root.position = center;

    // Items sit at level 2. With a depth limit of 1 they are not rendered and
    // one summary node next to the tags accounts for all of them.
    let show_items = options.max_depth.max(1) >= 2;
    let per_tag = options.items_per_tag;
    let fan_step = CONTENT_ARC / (per_tag + 1) as f64;
    let summary = !show_items && !matching.is_empty();
    let slots = tags.len() + usize::from(summary);

    for (i, (tag, freq)) in tags.into_iter().enumerate() {
        let angle = i as f64 * TAU / slots as f64;
        let id = format!("tag-{}", tag);
        let mut tag_node = PlanNode::new(id.clone(), NodeKind::Category, tag.clone(), 1);
        tag_node.count = freq;
        tag_node.path = vec![tag.clone()];
        tag_node.position = center.polar(angle, options.radius);

        if show_items {
            let base = angle - FRAC_PI_4;
            let tagged = matching.iter().filter(|c| c.has_tag(&tag)).take(per_tag);
            for (j, item) in tagged.enumerate() {
                let mut leaf = content_node(&id, (*item).clone(), 2);
                leaf.path = tag_node.path.clone();
                leaf.position = tag_node
                    .position
                    .polar(base + (j + 1) as f64 * fan_step, options.arc_radius);
                tag_node.children.push(leaf);
            }
        }
        root.children.push(tag_node);
    }

    if summary {
        let mut more = PlanNode::more_with(
            ROOT_ID,
            1,
            Truncation {
                categories: 0,
                content: matching.len() as u32,
            },
        );
        let angle = (slots - 1) as f64 * TAU / slots as f64;
        more.position = center.polar(angle, options.radius);
        root.children.push(more);
    }

    plan::emit(root, options.include_root)
}

/// `"query"` for a text search, `a + b` for selected tags, otherwise the default.
fn root_label(query: &ItemQuery, default: &str) -> String {
    let search = query.search.trim();
    if !search.is_empty() {
        format!("\"{}\"", search)
    } else if !query.tags.is_empty() {
        query.tags.join(" + ")
    } else {
        default.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Vec<ContentRef> {
        vec![
            ContentRef::new("m1", "Vectors", &["math", "algebra"]),
            ContentRef::new("m2", "Matrices", &["math", "algebra"]),
            ContentRef::new("m3", "Eigenvalues", &["math", "algebra"]),
            ContentRef::new("m4", "Determinants", &["math"]),
            ContentRef::new("m5", "Ownership", &["rust"]),
        ]
    }

    #[test]
    fn test_tags_around_root_with_item_cap() {
        let opts = LayoutOptions::default();
        let g = generate(&library(), &ItemQuery::default(), &opts);
        let root = g.root().unwrap();
        assert_eq!(root.label, "Knowledge Map");
        assert_eq!(g.outgoing("root"), vec!["tag-math", "tag-algebra", "tag-rust"]);

        let math = g.node("tag-math").unwrap();
        assert_eq!(math.count, 4);
        assert!((math.position.x - opts.radius).abs() < 1e-9);
        assert_eq!(g.outgoing("tag-math").len(), opts.items_per_tag);

        let leaf = g.node("content-tag-math-m1").unwrap();
        assert_eq!(leaf.kind, NodeKind::Content);
        assert!((leaf.position.distance(&math.position) - opts.arc_radius).abs() < 1e-6);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_max_tags_limit() {
        let items: Vec<ContentRef> = (0..15)
            .map(|i| {
                let tag = format!("t{}", i);
                ContentRef::new(format!("m{}", i), "x", &[tag.as_str()])
            })
            .collect();
        let g = generate(&items, &ItemQuery::default(), &LayoutOptions::default());
        assert_eq!(g.outgoing("root").len(), 10);
    }

    #[test]
    fn test_root_label_follows_query() {
        let search = ItemQuery {
            search: "vec".into(),
            tags: vec![],
        };
        let g = generate(&library(), &search, &LayoutOptions::default());
        assert_eq!(g.root().unwrap().label, "\"vec\"");
        assert_eq!(g.root().unwrap().count, 1);

        let tags = ItemQuery {
            search: String::new(),
            tags: vec!["math".into(), "algebra".into()],
        };
        let g = generate(&library(), &tags, &LayoutOptions::default());
        assert_eq!(g.root().unwrap().label, "math + algebra");
        assert!(g.node("tag-rust").is_none());
    }

    #[test]
    fn test_shallow_depth_summarises_items() {
        let opts = LayoutOptions {
            max_depth: 1,
            ..Default::default()
        };
        let g = generate(&library(), &ItemQuery::default(), &opts);
        let more = g.node("more-root").unwrap();
        assert_eq!(more.level, 1);
        assert_eq!(more.truncated.unwrap().content, 5);
        assert_eq!(more.label, "more… (5)");
        assert!(g.find_edge("root", "more-root").is_some());
        assert!(g.outgoing("tag-math").is_empty());
        assert!(g.nodes.iter().all(|n| n.level <= 1 && n.kind != NodeKind::Content));
        for edge in &g.edges {
            let (s, t) = (g.node(&edge.source).unwrap(), g.node(&edge.target).unwrap());
            assert_eq!(s.level + 1, t.level, "{} -> {}", s.id, t.id);
        }
    }

    #[test]
    fn test_item_levels_follow_edges() {
        let g = generate(&library(), &ItemQuery::default(), &LayoutOptions::default());
        assert!(g.node("more-root").is_none());
        for edge in &g.edges {
            let (s, t) = (g.node(&edge.source).unwrap(), g.node(&edge.target).unwrap());
            assert_eq!(s.level + 1, t.level);
        }
    }
}
