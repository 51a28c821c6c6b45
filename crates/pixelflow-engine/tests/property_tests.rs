//! Property tests for dependency ordering.

#![allow(clippy::unwrap_used)]

use pixelflow_compute::raster::gray_from_fn;
use pixelflow_engine::order::topological_order;
use pixelflow_engine::{CancelToken, CatalogImage, Engine, MemoryGlobals, NoProgress, Project};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;
use serde_json::json;

/// Random DAG as predecessor lists, in shuffled document order.
///
/// Node `d` may depend on node `e` only if `e` ranks lower, so the graph
/// is acyclic whatever the bits say.
fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..16)
        .prop_flat_map(|n| {
            (
                vec(vec(any::<bool>(), n), n),
                Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
            )
        })
        .prop_map(|(bits, rank)| {
            let n = rank.len();
            (0..n)
                .map(|d| {
                    (0..n)
                        .filter(|&e| rank[e] < rank[d] && bits[d][e])
                        .collect()
                })
                .collect()
        })
}

/// A tree of grayscale nodes under one image source, listed in shuffled
/// order. Returns the parent of every non-root node.
fn tree() -> impl Strategy<Value = (Vec<Index>, Vec<usize>)> {
    (1usize..12).prop_flat_map(|n| {
        (
            vec(any::<Index>(), n),
            Just((0..=n).collect::<Vec<usize>>()).prop_shuffle(),
        )
    })
}

proptest! {
    /// Every node appears once, after all of its predecessors.
    #[test]
    fn order_respects_dependencies(preds in dag()) {
        let order = topological_order(&preds).unwrap();
        let mut position = vec![usize::MAX; preds.len()];
        for (k, &node) in order.iter().enumerate() {
            prop_assert_eq!(position[node], usize::MAX);
            position[node] = k;
        }
        for (node, node_preds) in preds.iter().enumerate() {
            for &p in node_preds {
                prop_assert!(position[p] < position[node]);
            }
        }
    }

    /// Closing any edge into a loop is reported with both ends.
    #[test]
    fn back_edge_is_reported(preds in dag(), pick in any::<Index>()) {
        let edges: Vec<(usize, usize)> = preds
            .iter()
            .enumerate()
            .flat_map(|(d, ps)| ps.iter().map(move |&e| (e, d)))
            .collect();
        prop_assume!(!edges.is_empty());
        let (from, to) = edges[pick.index(edges.len())];

        let mut cyclic = preds;
        cyclic[from].push(to);
        let members = topological_order(&cyclic).unwrap_err();
        prop_assert!(members.contains(&from));
        prop_assert!(members.contains(&to));
    }

    /// The engine evaluates a shuffled tree parents first, and each
    /// node exactly once.
    #[test]
    fn engine_orders_shuffled_trees((parents, layout) in tree()) {
        // Node 0 is the source; node i > 0 hangs under a lower node.
        let id = |i: usize| format!("n{i}");
        let nodes: Vec<_> = layout
            .iter()
            .map(|&i| {
                if i == 0 {
                    json!({"id": id(0), "type": "image-input", "properties": {"name": "img"}})
                } else {
                    json!({"id": id(i), "type": "grayscale"})
                }
            })
            .collect();
        let connections: Vec<_> = (1..layout.len())
            .map(|i| {
                let parent = parents[i - 1].index(i);
                let port = if parent == 0 { "image" } else { "output" };
                json!({"from": {"node": id(parent), "property": port},
                       "to": {"node": id(i), "property": "input"}})
            })
            .collect();
        let project: Project = serde_json::from_value(json!({"graphs": [{
            "name": "Main", "isMain": true,
            "nodeGroup": {"nodes": nodes, "connections": connections}
        }]}))
        .unwrap();

        let mut globals = MemoryGlobals::new(vec![CatalogImage::new(
            "img",
            gray_from_fn(3, 3, |x, y| u8::try_from(x * 40 + y).unwrap()),
        )]);
        let mut engine = Engine::default();
        engine.update(&project, &mut globals, &mut NoProgress, &CancelToken::new()).unwrap();

        let order: Vec<&str> = engine.evaluation_order().collect();
        prop_assert_eq!(engine.last_evaluated().len(), layout.len());
        let position = |i: usize| order.iter().position(|&n| n == id(i)).unwrap();
        for i in 1..layout.len() {
            prop_assert!(position(parents[i - 1].index(i)) < position(i));
            prop_assert!(engine.output(&id(i), "output").is_some());
        }
    }
}
