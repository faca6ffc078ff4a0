//! Repository layer: the entry store.
//!
//! # Responsibility
//! - Own the relational decomposition of entries into `entries`,
//!   `entry_feelings` and `entry_activities`.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every multi-statement write is one transaction.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidArgument`)
//!   in addition to DB transport errors.

pub mod entry_repo;
