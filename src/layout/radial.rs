use std::f64::consts::TAU;

use super::constants::WEDGE_FILL;
use super::plan::PlanNode;
use super::LayoutOptions;

pub(super) fn place(root: &mut PlanNode, options: &LayoutOptions) {
    fan(root, options, 0.0, TAU);
}

/// Place the top-level nodes on the ring of radius R1, slot `i` at
/// `start + i·span/N`, and recurse into wedges of `slot·WEDGE_FILL`.
/// Children sit `R1·child_radius_ratio` from their parent; every further
/// level scales that distance by the ratio again.
pub(super) fn fan(root: &mut PlanNode, options: &LayoutOptions, start: f64, span: f64) {
    let center = options.center;
    root.position = center;
    let n = root.children.len();
    if n == 0 {
        return;
    }
    let slot = span / n as f64;
    for (i, child) in root.children.iter_mut().enumerate() {
        let angle = start + i as f64 * slot;
        child.position = center.polar(angle, options.radius);
        place_wedge(
            child,
            angle,
            slot * WEDGE_FILL,
            options.radius * options.child_radius_ratio,
            options.child_radius_ratio,
        );
    }
}

fn place_wedge(node: &mut PlanNode, angle: f64, wedge: f64, radius: f64, ratio: f64) {
    let m = node.children.len();
    if m == 0 {
        return;
    }
    let origin = node.position;
    let sub = wedge / m as f64;
    let first = angle - wedge / 2.0;
    for (k, child) in node.children.iter_mut().enumerate() {
        let child_angle = first + (k as f64 + 0.5) * sub;
        child.position = origin.polar(child_angle, radius);
        place_wedge(child, child_angle, sub, radius * ratio, ratio);
    }
}
