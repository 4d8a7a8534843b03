//! Shared utility functions

/// Narrowest box a node label is given.
pub const MIN_NODE_WIDTH: f64 = 120.0;

const PX_PER_CHAR: f64 = 8.0;

/// Display width in "character cells": CJK ideographs count double.
pub fn label_cells(label: &str) -> usize {
    label
        .chars()
        .map(|c| if ('\u{4E00}'..='\u{9FFF}').contains(&c) { 2 } else { 1 })
        .sum()
}

/// Rough pixel width for a label, used as a `minWidth` style hint.
pub fn estimate_node_width(label: &str) -> f64 {
    MIN_NODE_WIDTH + label_cells(label) as f64 * PX_PER_CHAR
}

/// Safely truncate a string at a UTF-8 boundary
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if max_bytes >= s.len() { return s; }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shorten a label to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let byte_end = label.char_indices().nth(keep).map(|(i, _)| i).unwrap_or(label.len());
    format!("{}…", safe_truncate(label, byte_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_ascii() {
        assert_eq!(safe_truncate("hello", 3), "hel");
        assert_eq!(safe_truncate("hello", 10), "hello");
        assert_eq!(safe_truncate("hello", 5), "hello");
    }

    #[test]
    fn test_safe_truncate_utf8() {
        // "数" is three bytes; cutting inside it backs off to the boundary
        assert_eq!(safe_truncate("a数b", 2), "a");
    }

    #[test]
    fn test_node_width_counts_cjk_double() {
        assert_eq!(estimate_node_width(""), MIN_NODE_WIDTH);
        assert_eq!(estimate_node_width("ab"), MIN_NODE_WIDTH + 16.0);
        assert_eq!(estimate_node_width("数学"), MIN_NODE_WIDTH + 32.0);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Linear Algebra", 20), "Linear Algebra");
        assert_eq!(truncate_label("Linear Algebra", 7), "Linear…");
        assert_eq!(truncate_label("数学分析", 3), "数学…");
    }
}
