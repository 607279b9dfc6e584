//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the collection contract (CRUD + subscribe) consumed by services.
//! - Isolate SQLite query details from store/form/presenter orchestration.
//!
//! # Invariants
//! - Repository writes validate input before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod habit_repo;
