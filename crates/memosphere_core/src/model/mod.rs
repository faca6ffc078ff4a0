//! Journal domain model.
//!
//! # Responsibility
//! - Define the entry aggregate and its closed type enumeration.
//! - Keep values immutable: replacements build new values instead of
//!   mutating persisted ones.

pub mod entry;
