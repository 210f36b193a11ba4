//! Purpose: Library crate behind the `tabline` CLI and tests.
//! Exports: `core` (store state machine, line format, errors) and `api` (public surface).
//! Role: Sequential, mode-gated access to delimiter-separated text files.
//! Invariants: One store owns at most one file handle; no internal locking.
//! Invariants: Core modules never install a tracing subscriber.
pub mod api;
pub mod core;
