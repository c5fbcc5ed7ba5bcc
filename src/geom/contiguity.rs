use anyhow::{Context, Result};
use geo::{BoundingRect, MultiPolygon, Relate};
use rayon::prelude::*;

use super::{bbox::BoundingBox, Geometries};

/// Queen predicate: boundaries share at least one point (edge or vertex).
/// In the 9-char DE-9IM string, index 4 is Boundary/Boundary.
pub(crate) fn boundaries_touch(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<bool> {
    Ok(a.relate(b).matches("****T****")?)
}

impl Geometries {
    /// Compute Queen contiguity over all shapes.
    ///
    /// Candidates come from the R-tree (bounding boxes grown by `tol`), then
    /// each pair is tested exactly once with the DE-9IM predicate. Rows are
    /// sorted, symmetric, and never contain the row's own index.
    pub(crate) fn queen_adjacencies(&self, tol: f64) -> Result<Vec<Vec<u32>>> {
        let forward = (0..self.len()).into_par_iter()
            .map(|i| self.touching_above(i, tol))
            .collect::<Result<Vec<_>>>()?;

        let mut adjacencies = vec![Vec::new(); self.len()];
        for (i, neighbors) in forward.into_iter().enumerate() {
            for j in neighbors {
                adjacencies[i].push(j as u32);
                adjacencies[j].push(i as u32);
            }
        }
        adjacencies.iter_mut().for_each(|row| { row.sort_unstable(); row.dedup(); });

        Ok(adjacencies)
    }

    /// Neighbors of shape `i` with index greater than `i`.
    fn touching_above(&self, i: usize, tol: f64) -> Result<Vec<usize>> {
        let Some(rect) = self.shapes()[i].bounding_rect() else { return Ok(Vec::new()) };

        let mut neighbors = Vec::new();
        for cand in self.query(&BoundingBox::padded(&rect, tol)) {
            let j = cand.idx();
            if j <= i { continue } // check each unordered pair once

            if boundaries_touch(&self.shapes()[i], &self.shapes()[j])
                .with_context(|| format!("[geom::contiguity] relate failed for shapes {i} and {j}"))?
            {
                neighbors.push(j);
            }
        }
        Ok(neighbors)
    }
}
