use geo::{BooleanOps, BoundingRect, Coord, MapCoords, MultiPolygon};
use rstar::{RTree, AABB};

use super::bbox::BoundingBox;

/// A collection of unit geometries indexed by an R-tree of bounding boxes.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes get no R-tree entry and therefore never match a query.
    pub(crate) fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            shapes,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Query the R-tree for bounding boxes intersecting the given envelope.
    #[inline]
    pub(super) fn query(&self, envelope: &AABB<[f64; 2]>) -> impl Iterator<Item = &BoundingBox> {
        self.rtree.locate_in_envelope_intersecting(envelope)
    }
}

/// Union a list of geometries into one (possibly multi-part) geometry.
/// This may be slow for large numbers of complex polygons.
pub(crate) fn union_all(parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    match parts.len() {
        0 => MultiPolygon(Vec::new()),
        1 => parts.into_iter().next().unwrap_or_else(|| MultiPolygon(Vec::new())),
        _ => parts.into_iter()
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| MultiPolygon(Vec::new())),
    }
}

/// Round every coordinate to a multiple of `grid`, closing hairline gaps
/// between neighbors that were digitized separately.
pub(crate) fn snap_to_grid(shape: &MultiPolygon<f64>, grid: f64) -> MultiPolygon<f64> {
    if grid <= 0.0 { return shape.clone() }
    shape.map_coords(|c| Coord {
        x: (c.x / grid).round() * grid,
        y: (c.y / grid).round() * grid,
    })
}
