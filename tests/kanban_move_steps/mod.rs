//! Step definitions for Kanban move scenarios.

pub mod given;
pub mod when;
pub mod world;
