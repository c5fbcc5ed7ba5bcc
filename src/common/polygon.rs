use shapefile as shp;

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>
pub(crate) fn shp_to_geo(p: &shp::Polygon) -> geo::MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ensure_closed(coords: &mut Vec<geo::Coord<f64>>) {
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last { coords.push(first) }
        }
    }

    /// Get the signed area of a geo::Coord list (negative for clockwise)
    fn signed_area(pts: &[geo::Coord<f64>]) -> f64 {
        pts.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0
    }

    // Shapefile stores each clockwise exterior followed by its counter-clockwise holes
    let mut polys: Vec<geo::Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<geo::LineString<f64>> = None;
    let mut current_holes: Vec<geo::LineString<f64>> = Vec::new();

    for ring in p.rings() {
        let mut coords = ring.points().iter()
            .map(|pt| geo::Coord { x: pt.x, y: pt.y })
            .collect::<Vec<_>>();
        ensure_closed(&mut coords);
        let is_exterior = signed_area(&coords) < 0.0;
        let ls = geo::LineString(coords);

        if is_exterior {
            if let Some(ext) = current_exterior.take() {
                polys.push(geo::Polygon::new(ext, std::mem::take(&mut current_holes)));
            }
            current_exterior = Some(ls);
        } else {
            current_holes.push(ls);
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(geo::Polygon::new(ext, current_holes));
    }

    geo::MultiPolygon(polys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn ring(points: &[(f64, f64)]) -> Vec<shp::Point> {
        points.iter().map(|&(x, y)| shp::Point { x, y }).collect()
    }

    #[test]
    fn exterior_with_hole_becomes_one_polygon() {
        let polygon = shp::Polygon::with_rings(vec![
            shp::PolygonRing::Outer(ring(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)])),
            shp::PolygonRing::Inner(ring(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)])),
        ]);
        let mp = shp_to_geo(&polygon);
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!((mp.unsigned_area() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn two_exteriors_become_two_polygons() {
        let polygon = shp::Polygon::with_rings(vec![
            shp::PolygonRing::Outer(ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)])),
            shp::PolygonRing::Outer(ring(&[(5.0, 5.0), (5.0, 6.0), (6.0, 6.0), (6.0, 5.0), (5.0, 5.0)])),
        ]);
        assert_eq!(shp_to_geo(&polygon).0.len(), 2);
    }
}
