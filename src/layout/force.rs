//! Closed-form stand-in for a force-directed layout. There is no simulation
//! loop: the ring-plus-half-arc shape is computed directly, which keeps the
//! output stable across runs.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::plan::PlanNode;
use super::LayoutOptions;

pub(super) fn place(root: &mut PlanNode, options: &LayoutOptions) {
    let center = options.center;
    root.position = center;
    let n = root.children.len();
    if n == 0 {
        return;
    }
    let step = TAU / n as f64;
    for (i, child) in root.children.iter_mut().enumerate() {
        let angle = i as f64 * step;
        child.position = center.polar(angle, options.radius);
        place_arc(child, angle, options.arc_radius);
    }
}

/// Children on a half circle around `node`, opening along `outward`.
fn place_arc(node: &mut PlanNode, outward: f64, radius: f64) {
    let m = node.children.len();
    if m == 0 {
        return;
    }
    let origin = node.position;
    let step = PI / (m + 1) as f64;
    let base = outward - FRAC_PI_2;
    for (k, child) in node.children.iter_mut().enumerate() {
        let angle = base + (k + 1) as f64 * step;
        child.position = origin.polar(angle, radius);
        place_arc(child, angle, radius);
    }
}
