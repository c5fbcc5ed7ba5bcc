//! CSV reading and writing through polars.

mod read;
mod write;

pub(crate) use read::*;
pub(crate) use write::*;
