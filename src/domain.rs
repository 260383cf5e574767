//! Domain models for the note store.
//!
//! This module contains the core domain types: the versioned [`Entry`] and
//! the metadata directive codec.

/// Entry model and relation logic.
pub mod entry;
pub use entry::Entry;

/// Extraction and removal of metadata directive lines.
pub mod metadata;
