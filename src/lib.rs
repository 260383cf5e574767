//! Plain-text note keeping.
//!
//! Notes ("entries") are delimited blocks inside one or more append-only
//! text files. Each entry can carry single-line metadata directives declaring
//! an identifier, tags, and relations to other entries.

pub mod domain;
pub use domain::{metadata, Entry};

/// Loading and querying the append-only entry store.
pub mod storage;
pub use storage::{LoadError, Store};

/// Inline reference expansion.
pub mod resolve;
pub use resolve::{Expansion, Resolver};

/// The token which, alone on a line, separates entries within a file.
pub const DELIMITER: &str = "---";
