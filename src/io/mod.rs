//! Format-specific reading and writing.
//!
//! - `csv` - CSV tables through polars
//! - `csr` - Compressed Sparse Row format for adjacency graphs
//! - `graph` - the per-level artifact set and its manifest

pub(crate) mod csr;
pub(crate) mod csv;
pub(crate) mod graph;

pub use csr::{read_csr, read_csr_bytes};
pub use graph::{artifact_names, write_graph, FileHash, LevelEntry, Manifest, SpotCheck};
