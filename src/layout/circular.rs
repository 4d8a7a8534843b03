use tracing::warn;

use super::plan::PlanNode;
use super::radial::fan;
use super::LayoutOptions;

/// Radial placement restricted to `start_angle..end_angle`.
pub(super) fn place(root: &mut PlanNode, options: &LayoutOptions) {
    let mut span = options.end_angle - options.start_angle;
    if !span.is_finite() || span <= 0.0 {
        warn!(
            start = options.start_angle,
            end = options.end_angle,
            "empty arc for circular layout, using full circle"
        );
        span = std::f64::consts::TAU;
    }
    fan(root, options, options.start_angle, span);
}
