//! Purpose: Define the stable public Rust API boundary for tabline.
//! Exports: Store, format, and error types needed by the CLI and callers.
//! Role: Public, additive-only surface over the `core` modules.
//! Invariants: Callers should import from here rather than `core::*` paths.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::format::{DEFAULT_DELIMITER, LINE_TERMINATOR, LineFormat, Row};
pub use crate::core::store::{DelimitedLineStore, Durability, Mode, Rows, StoreOptions};
