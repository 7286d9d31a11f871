//! Repository layer: local-store ports and their SQLite implementations.
//!
//! # Responsibility
//! - Define the narrow data access contracts scheduling depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Task writes enforce `Task::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod log_repo;
pub mod task_repo;
