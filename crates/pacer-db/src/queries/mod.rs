//! Query functions, grouped one module per table family.

pub mod activities;
pub mod plans;
pub mod tasks;
pub mod users;
