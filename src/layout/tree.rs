use super::plan::PlanNode;
use super::LayoutOptions;

/// Top-down tree: one row per level, every subtree owns a horizontal span of
/// `leaves · node_spacing` and its node sits centred over that span.
pub(super) fn place(root: &mut PlanNode, options: &LayoutOptions) {
    let width = root.leaf_count() as f64 * options.node_spacing;
    let left = options.center.x - width / 2.0;
    place_span(root, left, options);
}

fn place_span(node: &mut PlanNode, left: f64, options: &LayoutOptions) {
    let width = node.leaf_count() as f64 * options.node_spacing;
    node.position.x = left + width / 2.0;
    node.position.y = options.center.y + node.level as f64 * options.level_spacing;

    let mut cursor = left;
    for child in node.children.iter_mut() {
        let child_width = child.leaf_count() as f64 * options.node_spacing;
        place_span(child, cursor, options);
        cursor += child_width;
    }
}
