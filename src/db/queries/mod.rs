//! Database queries

pub mod credits;
pub mod template;
