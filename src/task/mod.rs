//! Kanban task board: tasks, their dense column ordering and the move
//! protocol.
//!
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Pure position-index planning in [`ordering`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ordering;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
