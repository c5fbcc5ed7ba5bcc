mod aggregate;
mod crosswalk;

pub use aggregate::{aggregate, assign_parents};
pub use crosswalk::{Crosswalk, MasterCrosswalk, PrefToBlock, PrefixCrosswalk};
