mod loader;
mod shapefile_source;
mod source;

pub use loader::load;
pub use shapefile_source::ShapefileSource;
pub use source::{RawRecord, RecordSource};
