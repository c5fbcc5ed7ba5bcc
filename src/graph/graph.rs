use ahash::AHashMap;
use anyhow::{ensure, Result};

use crate::map::UnitCode;

/// An undirected, unweighted adjacency graph over units, in compressed sparse row format.
///
/// Node `i` is `codes[i]`; rows are sorted, symmetric and never contain `i` itself.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    codes: Vec<UnitCode>,
    index: AHashMap<UnitCode, u32>, // Map between codes and node indices
    offsets: Vec<u32>,
    edges: Vec<u32>,
}

impl AdjacencyGraph {
    /// Construct a graph from per-node neighbor lists.
    ///
    /// Self-loops are dropped and every edge is mirrored, so the result is
    /// symmetric and irreflexive whatever the input lists contain.
    pub fn from_neighbor_lists(codes: Vec<UnitCode>, neighbors: &[Vec<u32>]) -> Result<Self> {
        ensure!(
            codes.len() == neighbors.len(),
            "[graph] codes len ({}) != neighbor lists len ({})", codes.len(), neighbors.len()
        );
        let n = codes.len();

        let mut rows: Vec<Vec<u32>> = vec![Vec::new(); n];
        for (i, row) in neighbors.iter().enumerate() {
            for &j in row {
                ensure!((j as usize) < n, "[graph] node {i} lists out-of-range neighbor {j}");
                if j as usize == i { continue }
                rows[i].push(j);
                rows[j as usize].push(i as u32);
            }
        }
        rows.iter_mut().for_each(|row| { row.sort_unstable(); row.dedup(); });

        let index = codes.iter().enumerate()
            .map(|(i, code)| (code.clone(), i as u32))
            .collect::<AHashMap<_, _>>();
        ensure!(index.len() == n, "[graph] duplicate codes in node list");

        Ok(Self {
            codes,
            index,
            offsets: std::iter::once(0u32).chain(
                rows.iter()
                    .map(|row| row.len() as u32)
                    .scan(0u32, |acc, len| { *acc += len; Some(*acc) })
            ).collect(),
            edges: rows.into_iter().flatten().collect(),
        })
    }

    /// Get the number of nodes in the graph.
    #[inline] pub fn node_count(&self) -> usize { self.codes.len() }

    /// Get the number of undirected edges in the graph.
    #[inline] pub fn edge_count(&self) -> usize { self.edges.len() / 2 }

    /// Number of stored (directed) entries, i.e. nonzeros of the symmetric matrix.
    #[inline] pub fn nnz(&self) -> usize { self.edges.len() }

    /// Node codes in index order.
    #[inline] pub fn codes(&self) -> &[UnitCode] { &self.codes }

    /// Code of a given node.
    #[inline] pub fn code(&self, node: usize) -> &UnitCode { &self.codes[node] }

    /// Node index of a code, if present.
    #[inline] pub fn index_of(&self, code: &UnitCode) -> Option<usize> { self.index.get(code).map(|&i| i as usize) }

    /// CSR row offsets; length `node_count() + 1`.
    #[inline] pub fn offsets(&self) -> &[u32] { &self.offsets }

    /// Flattened neighbor lists.
    #[inline] pub fn edges(&self) -> &[u32] { &self.edges }

    #[inline]
    fn range(&self, node: usize) -> std::ops::Range<usize> {
        self.offsets[node] as usize .. self.offsets[node + 1] as usize
    }

    /// Get the degree (number of neighbors) of a given node.
    #[inline] pub fn degree(&self, node: usize) -> usize { self.range(node).len() }

    /// Sorted neighbors of a given node.
    #[inline] pub fn neighbors(&self, node: usize) -> &[u32] { &self.edges[self.range(node)] }

    /// Returns true if `a` and `b` are adjacent (binary search over `a`'s row).
    pub fn adjacent(&self, a: usize, b: usize) -> bool {
        a != b && self.neighbors(a).binary_search(&(b as u32)).is_ok()
    }

    /// Per-node neighbor lists, position-aligned with `codes()`.
    pub fn to_neighbor_lists(&self) -> Vec<Vec<u32>> {
        (0..self.node_count()).map(|i| self.neighbors(i).to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Level;

    fn codes(n: usize) -> Vec<UnitCode> {
        (0..n).map(|i| UnitCode::normalize(Level::Prefecture, &(i + 1).to_string()).unwrap()).collect()
    }

    fn make_test_graph() -> AdjacencyGraph {
        AdjacencyGraph::from_neighbor_lists(codes(4), &[
            vec![1, 2],       // 0
            vec![0, 2],       // 1
            vec![0, 1, 3],    // 2
            vec![2],          // 3
        ]).unwrap()
    }

    #[test]
    fn csr_graph_construction() {
        let graph = make_test_graph();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.offsets, vec![0, 2, 4, 7, 8]);
        assert_eq!(graph.edges, vec![1, 2, 0, 2, 0, 1, 3, 2]);

        for window in graph.offsets.windows(2) { assert!(window[0] <= window[1]) }
    }

    #[test]
    fn one_sided_lists_are_mirrored() {
        let graph = AdjacencyGraph::from_neighbor_lists(codes(3), &[vec![1, 2], vec![], vec![]]).unwrap();
        assert!(graph.adjacent(1, 0));
        assert!(graph.adjacent(2, 0));
        assert!(!graph.adjacent(1, 2));
    }

    #[test]
    fn self_loops_and_duplicates_are_dropped() {
        let graph = AdjacencyGraph::from_neighbor_lists(codes(2), &[vec![0, 1, 1], vec![1, 0]]).unwrap();
        assert_eq!(graph.neighbors(0), &[1]);
        assert_eq!(graph.neighbors(1), &[0]);
        assert!(!graph.adjacent(0, 0));
    }

    #[test]
    fn adjacency_is_symmetric_and_irreflexive() {
        let graph = make_test_graph();
        for i in 0..graph.node_count() {
            assert!(!graph.adjacent(i, i));
            for j in 0..graph.node_count() {
                assert_eq!(graph.adjacent(i, j), graph.adjacent(j, i));
            }
        }
    }

    #[test]
    fn index_lookup() {
        let graph = make_test_graph();
        let code = UnitCode::normalize(Level::Prefecture, "3").unwrap();
        assert_eq!(graph.index_of(&code), Some(2));
        assert_eq!(graph.code(2), &code);
    }

    #[test]
    fn rejects_out_of_range_neighbor() {
        assert!(AdjacencyGraph::from_neighbor_lists(codes(2), &[vec![5], vec![]]).is_err());
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(AdjacencyGraph::from_neighbor_lists(codes(2), &[vec![]]).is_err());
    }

    #[test]
    fn empty_graph_is_valid() {
        let graph = AdjacencyGraph::from_neighbor_lists(Vec::new(), &[]).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.offsets, vec![0]);
    }
}
