use geo::Rect;
use rstar::{RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a unit geometry by index.
#[derive(Debug, Clone)]
pub(super) struct BoundingBox {
    idx: usize, // Index of corresponding MultiPolygon in Geometries::shapes
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(super) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the index of the corresponding MultiPolygon.
    #[inline] pub(super) fn idx(&self) -> usize { self.idx }

    /// Search envelope around this box, grown by `pad` on every side.
    pub(super) fn padded(rect: &Rect<f64>, pad: f64) -> AABB<[f64; 2]> {
        AABB::from_corners(
            [rect.min().x - pad, rect.min().y - pad],
            [rect.max().x + pad, rect.max().y + pad],
        )
    }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}
