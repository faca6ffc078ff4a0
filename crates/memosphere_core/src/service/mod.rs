//! Core use-case services.
//!
//! # Responsibility
//! - Normalize caller requests (id assignment, creation time, full-replace
//!   updates) before delegating to the entry store.
//! - Keep CLI/adapter layers decoupled from storage details.

pub mod entry_service;
