//! Deterministic circular placement of table nodes.
//!
//! Node `i` of `n` sits at angle `2π·i/n − π/2` on a circle of radius `r`
//! centred at `(r, r)`: the first table is at the top and the rest follow
//! clockwise (screen coordinates, y grows downwards). The same schema always
//! renders identically.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::TableNode;

pub const DEFAULT_LAYOUT_RADIUS: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub table: String,
    pub x: f64,
    pub y: f64,
}

/// Positions for `count` nodes on a circle of `radius`.
pub fn circle_positions(count: usize, radius: f64) -> Vec<Point> {
    if count == 1 {
        // A single node would otherwise land on the rim.
        return vec![Point {
            x: radius,
            y: radius,
        }];
    }
    (0..count)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / count as f64 - PI / 2.0;
            Point {
                x: radius + radius * theta.cos(),
                y: radius + radius * theta.sin(),
            }
        })
        .collect()
}

pub fn layout(nodes: &[TableNode], radius: f64) -> Vec<NodePosition> {
    nodes
        .iter()
        .zip(circle_positions(nodes.len(), radius))
        .map(|(node, p)| NodePosition {
            table: node.name.clone(),
            x: p.x,
            y: p.y,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_single_node_sits_at_center() {
        let points = circle_positions(1, 100.0);
        assert_eq!(points, vec![Point { x: 100.0, y: 100.0 }]);
    }

    #[test]
    fn test_no_nodes() {
        assert!(circle_positions(0, 100.0).is_empty());
    }

    #[test]
    fn test_four_nodes_quarter_turns_from_top() {
        let r = 100.0;
        let points = circle_positions(4, r);
        let expected = [(100.0, 0.0), (200.0, 100.0), (100.0, 200.0), (0.0, 100.0)];
        assert_eq!(points.len(), 4);
        for (p, (x, y)) in points.iter().zip(expected) {
            assert_relative_eq!(p.x, x, epsilon = 1e-9);
            assert_relative_eq!(p.y, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_layout_keeps_node_order() {
        let nodes: Vec<TableNode> = ["a", "b", "c"]
            .iter()
            .map(|n| TableNode {
                name: n.to_string(),
                columns: vec![],
            })
            .collect();
        let positions = layout(&nodes, DEFAULT_LAYOUT_RADIUS);
        let names: Vec<_> = positions.iter().map(|p| p.table.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_relative_eq!(positions[0].x, DEFAULT_LAYOUT_RADIUS, epsilon = 1e-9);
        assert_relative_eq!(positions[0].y, 0.0, epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn prop_nodes_are_equidistant_from_center(n in 2usize..64, r in 1.0f64..1000.0) {
            for p in circle_positions(n, r) {
                let d = ((p.x - r).powi(2) + (p.y - r).powi(2)).sqrt();
                prop_assert!((d - r).abs() < 1e-6 * r);
            }
        }

        #[test]
        fn prop_layout_is_deterministic(n in 0usize..64, r in 1.0f64..1000.0) {
            prop_assert_eq!(circle_positions(n, r), circle_positions(n, r));
        }
    }
}
