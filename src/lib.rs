#![doc = "Queen-contiguity graphs and a canonical municipality code space for Japan's electoral and administrative hierarchy"]
pub mod aggregate;
pub mod apportion;
pub mod cli;
pub mod commands;
mod common;
pub mod config;
pub mod error;
mod geom;
pub mod graph;
pub mod io;
pub mod load;
pub mod map;
pub mod pipeline;
pub mod registry;

#[doc(inline)]
pub use error::BuildError;

#[doc(inline)]
pub use map::{AdministrativeUnit, Level, ParentRef, UnitCode};

#[doc(inline)]
pub use graph::{AdjacencyGraph, GraphDiagnostics};

#[doc(inline)]
pub use pipeline::{LevelOutcome, Pipeline, RunSummary};
