mod store;
pub use store::{split_entries, LoadError, Store};
