mod bbox;
mod contiguity;
mod geom;

pub(crate) use geom::{snap_to_grid, union_all, Geometries};
