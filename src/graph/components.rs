use serde::Serialize;

use super::AdjacencyGraph;

/// Disjoint-set forest with path halving and union by size.
#[derive(Debug, Clone)]
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), size: vec![1; n] }
    }

    /// Representative of the set containing `x`.
    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets containing `a` and `b`; returns false if already merged.
    pub(crate) fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb { return false }
        if self.size[ra] < self.size[rb] { std::mem::swap(&mut ra, &mut rb) }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

/// Connectivity statistics computed alongside a graph; never mutates it.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDiagnostics {
    pub cardinalities: Vec<usize>,
    pub min_neighbors: usize,
    pub max_neighbors: usize,
    pub mean_neighbors: f64,
    /// Connected components, largest first (ties broken by lowest node index).
    pub components: Vec<Vec<usize>>,
    pub isolated: Vec<usize>,
}

impl GraphDiagnostics {
    pub fn compute(graph: &AdjacencyGraph) -> Self {
        let n = graph.node_count();
        let cardinalities = (0..n).map(|i| graph.degree(i)).collect::<Vec<_>>();

        let mut forest = UnionFind::new(n);
        for i in 0..n {
            for &j in graph.neighbors(i) {
                forest.union(i, j as usize);
            }
        }

        // Group nodes by root, keeping first-seen order so each component is sorted
        let mut slot_of_root = vec![usize::MAX; n];
        let mut components: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = forest.find(i);
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = components.len();
                components.push(Vec::new());
            }
            components[slot_of_root[root]].push(i);
        }
        components.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

        Self {
            min_neighbors: cardinalities.iter().copied().min().unwrap_or(0),
            max_neighbors: cardinalities.iter().copied().max().unwrap_or(0),
            mean_neighbors: if n > 0 { cardinalities.iter().sum::<usize>() as f64 / n as f64 } else { 0.0 },
            isolated: (0..n).filter(|&i| cardinalities[i] == 0).collect(),
            cardinalities,
            components,
        }
    }

    #[inline] pub fn component_count(&self) -> usize { self.components.len() }

    /// Sizes of the connected components, largest first.
    pub fn component_sizes(&self) -> Vec<usize> {
        self.components.iter().map(Vec::len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Level, UnitCode};

    fn graph(lists: &[Vec<u32>]) -> AdjacencyGraph {
        let codes = (0..lists.len())
            .map(|i| UnitCode::normalize(Level::Municipality, &(1001 + i).to_string()).unwrap())
            .collect();
        AdjacencyGraph::from_neighbor_lists(codes, lists).unwrap()
    }

    #[test]
    fn union_find_merges_sets() {
        let mut uf = UnionFind::new(4);
        assert!(uf.union(0, 1));
        assert!(uf.union(2, 3));
        assert!(!uf.union(1, 0));
        assert_eq!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(1), uf.find(2));
        assert!(uf.union(1, 3));
        assert_eq!(uf.find(0), uf.find(2));
    }

    #[test]
    fn mainland_and_islands() {
        // 0-1-2 chain, 3-4 pair, 5 isolated
        let diag = GraphDiagnostics::compute(&graph(&[
            vec![1], vec![0, 2], vec![1], vec![4], vec![3], vec![],
        ]));
        assert_eq!(diag.component_count(), 3);
        assert_eq!(diag.components, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);
        assert_eq!(diag.component_sizes(), vec![3, 2, 1]);
        assert_eq!(diag.isolated, vec![5]);
        assert_eq!(diag.min_neighbors, 0);
        assert_eq!(diag.max_neighbors, 2);
        assert!((diag.mean_neighbors - 8.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn ties_break_by_lowest_index() {
        let diag = GraphDiagnostics::compute(&graph(&[vec![], vec![2], vec![1], vec![]]));
        assert_eq!(diag.components, vec![vec![1, 2], vec![0], vec![3]]);
    }

    #[test]
    fn empty_graph() {
        let diag = GraphDiagnostics::compute(&graph(&[]));
        assert_eq!(diag.component_count(), 0);
        assert_eq!(diag.mean_neighbors, 0.0);
        assert!(diag.isolated.is_empty());
    }
}
