mod build;
mod components;
mod graph;

pub use build::{build, validate, ContiguityOptions};
pub use components::GraphDiagnostics;
pub use graph::AdjacencyGraph;
