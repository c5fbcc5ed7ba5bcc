mod data;
mod registry;
mod remap;

pub use data::{RegistryData, RemapData, SuccessorSpec};
pub use registry::{reconcile, CodeRegistry, Reconciliation, CANONICAL_MUNICIPALITY_TARGET};
pub use remap::{Successor, WardRemap};
