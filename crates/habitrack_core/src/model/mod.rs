//! Habit domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one record shape shared by repository, store and form.
//!
//! # Invariants
//! - Every habit is identified by a stable, repository-assigned `HabitId`.
//! - Deletion is a hard delete; the collection is the only durable copy.

pub mod habit;
