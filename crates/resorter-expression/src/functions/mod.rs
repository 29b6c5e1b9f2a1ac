//! Built-in function groups.

pub mod conditions;
pub mod counter;
pub mod list;
pub mod num;
pub mod set;
pub mod text;
