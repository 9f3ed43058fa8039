//! Velvet LLM crate - the language capability collaborator boundary.
//!
//! The platform treats the language model as an opaque, fallible, slow
//! capability with two operations: intent classification and text
//! generation. Both return raw text; all parsing and defensive extraction
//! happens on the caller's side of the boundary.

pub mod client;

pub use client::{HttpLanguageModel, LanguageModel, LlmError};
