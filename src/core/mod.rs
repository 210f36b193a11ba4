// Core modules implementing the line store, line format, and error modeling.
pub mod error;
pub mod format;
pub mod store;
