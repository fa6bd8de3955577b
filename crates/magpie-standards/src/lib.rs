//! Coding-standards resolution for diff-driven context selection.
//!
//! Scans a unified diff for changed file extensions, maps them to
//! standards documents, and concatenates the applicable documents into
//! one labeled text block for the completion system prompt.

pub mod resolver;
pub mod store;

pub use resolver::{changed_extensions, resolve};
pub use store::{DirStore, MemoryStore, StandardsStore};
