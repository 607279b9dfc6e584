//! Realtime synchronization primitives.
//!
//! # Responsibility
//! - Fan committed collection changes out to live subscribers.
//! - Keep delivery ordering and cancellation rules in one place.
//!
//! # Invariants
//! - Deliveries happen only when the host drains the feed, never inline with
//!   the write that caused them.

pub mod change_feed;
