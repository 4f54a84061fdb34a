//! Core domain logic: plan ownership, the task-attempt state machine, and
//! user API tokens. Persistence lives in `pacer-db`; this crate decides.

pub mod attempt;
pub mod plan;
pub mod token;
