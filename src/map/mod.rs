mod code;
mod level;
mod unit;

pub use code::UnitCode;
pub use level::Level;
pub use unit::{AdministrativeUnit, ParentRef};
