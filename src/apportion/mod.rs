mod apportion;
mod schema;
mod table;

pub use apportion::apportion;
pub use schema::{RatioSpec, TableSchema};
pub use table::{CountTable, Row};
