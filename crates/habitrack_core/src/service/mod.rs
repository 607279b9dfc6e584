//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into screen-level APIs (store, form,
//!   list presenter).
//! - Keep UI/FFI layers decoupled from storage details.

pub mod habit_form;
pub mod habit_list;
pub mod habit_store;
