//! Dependency ordering shared by the evaluator and the compiler.
//!
//! Nodes are placed with a worklist: the front entry is placed once all of
//! its predecessors are, otherwise it rotates to the back. Independent
//! nodes therefore keep their document order. When a full rotation places
//! nothing the remainder contains a cycle, which is reported by its
//! strongly connected components.

use std::collections::VecDeque;

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

/// Order `0..predecessors.len()` so every node follows its predecessors.
///
/// Predecessor indices out of range are ignored.
///
/// # Errors
///
/// Returns the indices of the nodes on a cycle, sorted, if the
/// dependencies are cyclic.
pub fn topological_order(predecessors: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let count = predecessors.len();
    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);
    let mut work: VecDeque<usize> = (0..count).collect();
    let mut stalled = 0;

    while let Some(index) = work.pop_front() {
        let ready = predecessors[index]
            .iter()
            .all(|&p| p >= count || placed[p]);
        if ready {
            placed[index] = true;
            order.push(index);
            stalled = 0;
        } else {
            work.push_back(index);
            stalled += 1;
            if stalled > work.len() {
                return Err(cycle_members(predecessors, &work));
            }
        }
    }
    Ok(order)
}

/// Nodes of `remaining` lying on a cycle.
fn cycle_members(predecessors: &[Vec<usize>], remaining: &VecDeque<usize>) -> Vec<usize> {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<_> = (0..predecessors.len()).map(|i| graph.add_node(i)).collect();
    for &index in remaining {
        for &p in &predecessors[index] {
            if let Some(&from) = nodes.get(p) {
                graph.add_edge(from, nodes[index], ());
            }
        }
    }

    let mut members: Vec<usize> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || graph.contains_edge(component[0], component[0])
        })
        .flatten()
        .map(|n| graph[n])
        .collect();
    if members.is_empty() {
        members = remaining.iter().copied().collect();
    }
    members.sort_unstable();
    members
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn chain_is_ordered_regardless_of_document_order() {
        // 2 -> 0 -> 1
        let preds = vec![vec![2], vec![0], vec![]];
        assert_eq!(topological_order(&preds).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn independent_nodes_keep_document_order() {
        let preds = vec![vec![], vec![], vec![]];
        assert_eq!(topological_order(&preds).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn diamond() {
        // 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3
        let preds = vec![vec![], vec![0], vec![0], vec![1, 2]];
        assert_eq!(topological_order(&preds).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn cycle_is_reported_without_its_tail() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let preds = vec![vec![], vec![0, 2], vec![1], vec![2]];
        assert_eq!(topological_order(&preds).unwrap_err(), vec![1, 2]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let preds = vec![vec![], vec![1]];
        assert_eq!(topological_order(&preds).unwrap_err(), vec![1]);
    }

    #[test]
    fn unknown_predecessors_are_ignored() {
        let preds = vec![vec![7], vec![0]];
        assert_eq!(topological_order(&preds).unwrap(), vec![0, 1]);
    }
}
