//! Taskboard: Kanban task ordering, moves and realtime board updates.
//!
//! Tasks live in named columns of a project board. Within each
//! (project, column) pair their positions form a dense, zero-based index
//! that every create, move and delete keeps intact, even when many clients
//! drag cards at once.
//!
//! # Architecture
//!
//! Taskboard follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`task`]: Task aggregate, position index, move algorithm and store
//! - [`realtime`]: Per-project fan-out of committed board events
//! - [`client`]: Optimistic board cache used by interactive clients
//! - [`http`]: Axum router and websocket endpoint
//! - [`config`]: Server settings read from the environment

pub mod client;
pub mod config;
pub mod http;
pub mod realtime;
pub mod task;
