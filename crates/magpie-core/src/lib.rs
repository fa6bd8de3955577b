//! Core types, configuration, and error handling for the Magpie bot.
//!
//! This crate provides the shared foundation used by all other Magpie crates:
//! - [`MagpieError`] — unified error type using `thiserror`
//! - [`MagpieConfig`] — configuration loaded from `.magpie.toml`
//! - Shared types: [`FailureKind`], [`CompletionFailure`], [`CompletionOutcome`]

mod config;
mod error;
mod types;

pub use config::{
    AgentConfig, GithubConfig, LlmConfig, MagpieConfig, ProviderRoute, ReviewConfig,
    StandardsConfig, Transport,
};
pub use error::MagpieError;
pub use types::{CompletionFailure, CompletionOutcome, FailureKind};

/// A convenience `Result` type for Magpie operations.
pub type Result<T> = std::result::Result<T, MagpieError>;
