//! Re-layout of an edited graph as a top-down forest.
//!
//! Positions depend only on topology and insertion order, never on the
//! current coordinates, so running the layout on its own output is a no-op.

use std::collections::{HashMap, VecDeque};
use tracing::debug;

use crate::graph::{Graph, GraphModel, NodeKind, Position};
use crate::layout::LayoutOptions;

pub const DEFAULT_COMPONENT_GAP: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoLayout {
    pub level_spacing: f64,
    pub node_spacing: f64,
    /// Horizontal gap between disconnected components.
    pub component_gap: f64,
}

impl Default for AutoLayout {
    fn default() -> Self {
        Self {
            level_spacing: 150.0,
            node_spacing: 180.0,
            component_gap: DEFAULT_COMPONENT_GAP,
        }
    }
}

/// Spanning forest over node indices.
struct Forest {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
    depth: Vec<usize>,
    /// Parents before children, component by component.
    order: Vec<usize>,
}

impl AutoLayout {
    pub fn from_options(options: &LayoutOptions, component_gap: f64) -> Self {
        Self {
            level_spacing: options.level_spacing,
            node_spacing: options.node_spacing,
            component_gap,
        }
    }

    /// Same nodes and edges with fresh positions.
    pub fn reflow(&self, graph: &Graph) -> Graph {
        let positions = self.positions(graph);
        let mut out = graph.clone();
        for (node, position) in out.nodes.iter_mut().zip(positions) {
            node.position = position;
        }
        out
    }

    pub fn reflow_in_place(&self, model: &mut GraphModel) {
        let positions = self.positions(model.graph());
        let ids: Vec<String> = model.graph().nodes.iter().map(|n| n.id.clone()).collect();
        for (id, position) in ids.iter().zip(positions) {
            model.set_position(id, position);
        }
    }

    /// New position for every node, aligned with `graph.nodes`.
    pub fn positions(&self, graph: &Graph) -> Vec<Position> {
        let n = graph.nodes.len();
        if n == 0 {
            return Vec::new();
        }
        let forest = spanning_forest(graph);

        let mut leaves = vec![1usize; n];
        for &u in forest.order.iter().rev() {
            if !forest.children[u].is_empty() {
                leaves[u] = forest.children[u].iter().map(|&c| leaves[c]).sum();
            }
        }

        let mut left = vec![0.0f64; n];
        let mut cursor = 0.0;
        for &root in &forest.roots {
            left[root] = cursor;
            cursor += leaves[root] as f64 * self.node_spacing + self.component_gap;
        }
        let total = cursor - self.component_gap;
        let shift = -total / 2.0;

        let mut positions = vec![Position::default(); n];
        for &u in &forest.order {
            let width = leaves[u] as f64 * self.node_spacing;
            positions[u] = Position::new(
                left[u] + width / 2.0 + shift,
                forest.depth[u] as f64 * self.level_spacing,
            );
            let mut child_left = left[u];
            for &c in &forest.children[u] {
                left[c] = child_left;
                child_left += leaves[c] as f64 * self.node_spacing;
            }
        }

        debug!(nodes = n, components = forest.roots.len(), "auto layout computed");
        positions
    }
}

/// Roots in priority order: the `Root` node, then nodes without incoming
/// edges, then whatever is left (cycles). Each BFS follows outgoing edges
/// and only falls back to incoming ones once those run out, so reversed
/// user edges stay attached to their component.
fn spanning_forest(graph: &Graph) -> Forest {
    let n = graph.nodes.len();
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
    for edge in &graph.edges {
        if let (Some(&s), Some(&t)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
            outgoing[s].push(t);
            incoming[t].push(s);
        }
    }

    let mut candidates: Vec<usize> = Vec::with_capacity(2 * n + 1);
    candidates.extend(graph.nodes.iter().position(|node| node.kind == NodeKind::Root));
    candidates.extend((0..n).filter(|&i| incoming[i].is_empty()));
    candidates.extend(0..n);

    let mut forest = Forest {
        roots: Vec::new(),
        children: vec![Vec::new(); n],
        depth: vec![0; n],
        order: Vec::with_capacity(n),
    };
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();

    for root in candidates {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        forest.roots.push(root);
        queue.push_back(root);
        let start = forest.order.len();
        loop {
            while let Some(u) = queue.pop_front() {
                forest.order.push(u);
                for &v in &outgoing[u] {
                    if !visited[v] {
                        visited[v] = true;
                        forest.attach(u, v);
                        queue.push_back(v);
                    }
                }
            }
            // Directed reach exhausted: pull in the first unvisited source
            // pointing into this component and keep going from there.
            let mut pulled = false;
            for i in start..forest.order.len() {
                let u = forest.order[i];
                for &v in &incoming[u] {
                    if !visited[v] {
                        visited[v] = true;
                        forest.attach(u, v);
                        queue.push_back(v);
                        pulled = true;
                    }
                }
                if pulled {
                    break;
                }
            }
            if !pulled {
                break;
            }
        }
    }
    forest
}

impl Forest {
    fn attach(&mut self, parent: usize, child: usize) {
        self.children[parent].push(child);
        self.depth[child] = self.depth[parent] + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SequentialIds;
    use proptest::prelude::*;

    fn editor_graph() -> GraphModel {
        let mut m = GraphModel::with_ids(SequentialIds::new("n"));
        m.add_node(NodeKind::Root, "Map", Position::new(13.0, -7.0), None).unwrap();
        m.add_node(NodeKind::Category, "A", Position::new(400.0, 90.0), Some("n1")).unwrap();
        m.add_node(NodeKind::Category, "B", Position::new(-20.0, 5.0), Some("n1")).unwrap();
        m.add_node(NodeKind::Content, "A.1", Position::new(1.0, 1.0), Some("n2")).unwrap();
        m
    }

    fn pos(g: &Graph, id: &str) -> Position {
        g.node(id).map(|n| n.position).unwrap_or_default()
    }

    #[test]
    fn test_rows_and_parent_centering() {
        let layout = AutoLayout::default();
        let g = layout.reflow(editor_graph().graph());
        let (root, a, b, a1) = (pos(&g, "n1"), pos(&g, "n2"), pos(&g, "n3"), pos(&g, "n4"));
        assert_eq!(root.y, 0.0);
        assert_eq!(a.y, layout.level_spacing);
        assert_eq!(a1.y, 2.0 * layout.level_spacing);
        assert!((root.x - (a.x + b.x) / 2.0).abs() < 1e-9);
        assert!((a.x - a1.x).abs() < 1e-9);
        assert!((b.x - a.x - layout.node_spacing).abs() < 1e-9);
        assert!(root.x.abs() < 1e-9);
    }

    #[test]
    fn test_reflow_is_idempotent() {
        let layout = AutoLayout::default();
        let once = layout.reflow(editor_graph().graph());
        let twice = layout.reflow(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_identities_are_preserved() {
        let m = editor_graph();
        let g = AutoLayout::default().reflow(m.graph());
        let before: Vec<&str> = m.graph().nodes.iter().map(|n| n.id.as_str()).collect();
        let after: Vec<&str> = g.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(before, after);
        assert_eq!(m.graph().edges, g.edges);
    }

    #[test]
    fn test_components_side_by_side() {
        let mut m = GraphModel::with_ids(SequentialIds::new("n"));
        m.add_node(NodeKind::Category, "A", Position::default(), None).unwrap();
        m.add_node(NodeKind::Category, "A.1", Position::default(), Some("n1")).unwrap();
        m.add_node(NodeKind::Category, "B", Position::default(), None).unwrap();
        let layout = AutoLayout::default();
        let g = layout.reflow(m.graph());
        let (a, b) = (pos(&g, "n1"), pos(&g, "n3"));
        assert_eq!(a.y, 0.0);
        assert_eq!(b.y, 0.0);
        assert!((b.x - a.x - (layout.node_spacing + layout.component_gap)).abs() < 1e-9);
    }

    #[test]
    fn test_cycle_without_root_is_laid_out() {
        let mut m = GraphModel::with_ids(SequentialIds::new("n"));
        for label in ["A", "B", "C"] {
            m.add_node(NodeKind::Category, label, Position::default(), None).unwrap();
        }
        m.connect("n1", "n2").unwrap();
        m.connect("n2", "n3").unwrap();
        m.connect("n3", "n1").unwrap();
        let g = AutoLayout::default().reflow(m.graph());
        assert_eq!(pos(&g, "n1").y, 0.0);
        assert_eq!(pos(&g, "n2").y, 150.0);
        assert_eq!(pos(&g, "n3").y, 300.0);
    }

    #[test]
    fn test_reversed_user_edge_stays_attached() {
        let mut m = editor_graph();
        let orphan = m.add_node(NodeKind::Category, "Loose", Position::default(), None).unwrap();
        m.connect(&orphan.id, "n4").unwrap();
        let g = AutoLayout::default().reflow(m.graph());
        // n5 has no incoming edges, but it hangs under n4 in the root's tree
        assert_eq!(pos(&g, "n5").y, 3.0 * 150.0);
    }

    #[test]
    fn test_reflow_in_place_matches_reflow() {
        let mut m = editor_graph();
        let layout = AutoLayout::default();
        let expected = layout.reflow(m.graph());
        layout.reflow_in_place(&mut m);
        assert_eq!(m.graph(), &expected);
    }

    #[test]
    fn test_empty_graph() {
        assert!(AutoLayout::default().reflow(&Graph::new()).nodes.is_empty());
    }

    // ------------------------------------------------------------------------
    // Random edit sequences
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum Edit {
        Add(usize),
        AddOrphan,
        Connect(usize, usize),
        Delete(usize),
    }

    fn edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            3 => (0usize..24).prop_map(Edit::Add),
            2 => Just(Edit::AddOrphan),
            3 => (0usize..24, 0usize..24).prop_map(|(a, b)| Edit::Connect(a, b)),
            1 => (0usize..24).prop_map(Edit::Delete),
        ]
    }

    fn nth_id(m: &GraphModel, i: usize) -> Option<String> {
        let nodes = &m.graph().nodes;
        (!nodes.is_empty()).then(|| nodes[i % nodes.len()].id.clone())
    }

    fn edited_model(with_root: bool, edits: &[Edit]) -> GraphModel {
        let mut m = GraphModel::with_ids(SequentialIds::new("n"));
        if with_root {
            m.add_node(NodeKind::Root, "Map", Position::new(5.0, 5.0), None).unwrap();
        }
        for (step, edit) in edits.iter().enumerate() {
            let at = Position::new(step as f64 * 31.0, -(step as f64) * 17.0);
            match edit {
                Edit::Add(i) => {
                    let parent = nth_id(&m, *i);
                    let _ = m.add_node(NodeKind::Category, "x", at, parent.as_deref());
                }
                Edit::AddOrphan => {
                    let _ = m.add_node(NodeKind::Content, "free", at, None);
                }
                Edit::Connect(a, b) => {
                    // back edges included, so cycles are common
                    if let (Some(s), Some(t)) = (nth_id(&m, *a), nth_id(&m, *b)) {
                        let _ = m.connect(&s, &t);
                    }
                }
                Edit::Delete(i) => {
                    if let Some(id) = nth_id(&m, *i) {
                        m.delete_node(&id);
                    }
                }
            }
        }
        m
    }

    proptest! {
        #[test]
        fn reflow_of_reflow_is_reflow(
            with_root in any::<bool>(),
            edits in prop::collection::vec(edit(), 0..50),
        ) {
            let m = edited_model(with_root, &edits);
            let layout = AutoLayout::default();
            let once = layout.reflow(m.graph());
            let twice = layout.reflow(&once);
            prop_assert_eq!(&once, &twice);
            for node in &once.nodes {
                let row = node.position.y / layout.level_spacing;
                prop_assert!((row - row.round()).abs() < 1e-9);
                prop_assert!(row >= 0.0);
            }
        }
    }
}
