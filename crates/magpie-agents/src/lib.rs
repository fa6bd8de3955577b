//! Role-specific prompt templates for PR feedback agents.
//!
//! The registry is a static, closed set: each [`AgentKind`] variant
//! embeds a fixed role description and a user-prompt template
//! parameterized by the diff. Unknown keys are rejected explicitly.

mod registry;

pub use registry::AgentKind;
