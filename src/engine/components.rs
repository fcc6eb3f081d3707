//! Connected components over shared grouping keys.
//!
//! Group-union mode lets an asset carry several keys; any two assets sharing a
//! key are linked, and stacks are the connected components of that graph.
//!
//! ```text
//! key index   "g0c0|originalFileName=IMG_1" -> [0, 3]
//!             "g0c1|checksum=abc"           -> [3, 7]
//! edges       0-3, 3-7          (each pair once, via neighbor sets)
//! components  [0, 3, 7]         (iterative DFS, first-seen order)
//! ```
//!
//! Traversal uses an explicit stack so component size is not bounded by the
//! call stack.

use super::time_merge::MergedBucket;
use std::collections::BTreeSet;

/// Components of at least two assets, as asset indices.
///
/// Nodes are visited in ascending asset index; within a component, members
/// appear in DFS discovery order.
pub(crate) fn connected_components(asset_count: usize, buckets: &[MergedBucket]) -> Vec<Vec<usize>> {
    let mut neighbors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); asset_count];
    let mut linked = vec![false; asset_count];

    for bucket in buckets {
        let members = &bucket.members;
        if members.len() < 2 {
            continue;
        }
        for (i, &a) in members.iter().enumerate() {
            linked[a] = true;
            for &b in &members[i + 1..] {
                if a != b {
                    neighbors[a].insert(b);
                    neighbors[b].insert(a);
                }
            }
        }
    }

    let mut visited = vec![false; asset_count];
    let mut components = Vec::new();
    for start in 0..asset_count {
        if visited[start] || !linked[start] {
            continue;
        }
        visited[start] = true;
        let mut component = Vec::new();
        let mut pending = vec![start];
        while let Some(node) = pending.pop() {
            component.push(node);
            for &next in neighbors[node].iter().rev() {
                if !visited[next] {
                    visited[next] = true;
                    pending.push(next);
                }
            }
        }
        if component.len() >= 2 {
            components.push(component);
        }
    }

    log::debug!("[components] nodes={} components={}", asset_count, components.len());
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(key: &str, members: &[usize]) -> MergedBucket {
        MergedBucket { key: key.to_string(), members: members.to_vec() }
    }

    #[test]
    fn shared_keys_chain_transitively() {
        let buckets = vec![bucket("k1", &[0, 3]), bucket("k2", &[3, 5]), bucket("k3", &[1])];
        assert_eq!(connected_components(6, &buckets), vec![vec![0, 3, 5]]);
    }

    #[test]
    fn singletons_are_dropped() {
        let buckets = vec![bucket("k1", &[0]), bucket("k2", &[1]), bucket("k3", &[2, 4])];
        assert_eq!(connected_components(5, &buckets), vec![vec![2, 4]]);
    }

    #[test]
    fn duplicate_edges_do_not_duplicate_members() {
        let buckets = vec![bucket("k1", &[0, 1]), bucket("k2", &[0, 1]), bucket("k3", &[1, 2])];
        let components = connected_components(3, &buckets);
        assert_eq!(components.len(), 1);
        let mut members = components[0].clone();
        members.sort_unstable();
        assert_eq!(members, vec![0, 1, 2]);
    }

    #[test]
    fn components_ordered_by_first_member() {
        let buckets = vec![bucket("b", &[4, 5]), bucket("a", &[1, 2])];
        let components = connected_components(6, &buckets);
        assert_eq!(components, vec![vec![1, 2], vec![4, 5]]);
    }

    #[test]
    fn long_chains_do_not_recurse() {
        let buckets: Vec<MergedBucket> = (0..50_000).map(|i| bucket(&format!("k{i}"), &[i, i + 1])).collect();
        let components = connected_components(50_001, &buckets);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 50_001);
    }
}
