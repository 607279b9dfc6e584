//! Flutter-facing bindings for habitrack.
//!
//! Dart code generation reads `api`; everything here is a thin adapter over
//! `habitrack_core`.

pub mod api;
