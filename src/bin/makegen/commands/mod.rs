//! Command implementations

pub mod clean;
pub mod completions;
pub mod generate;
pub mod linkplan;
