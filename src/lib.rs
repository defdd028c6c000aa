//! # lminspect: Incremental Language-Model Code Inspection
//!
//! Sends Java source to a chat model, asks it to annotate code that could use
//! newer language features, and turns the annotations into structured
//! findings. Findings are cached per code unit by content hash so that only
//! edited methods are re-inspected, and are presented through several
//! renderers that merge updates instead of redrawing.
//!
//! ## Architecture
//!
//! - **[`symbols`]**: Documents, Tree-sitter outline, code units and content hashes
//! - **[`inspection`]**: Findings, problems and severities
//! - **[`copilot`]**: Transcript encoding, chat round trip with continuation, reply parsing
//! - **[`cache`]**: Content-addressed per-unit finding cache
//! - **[`debounce`]**: Keyed debouncing of bursts of calls
//! - **[`inspector`]**: Cached, debounced and whole-document inspection entry points
//! - **[`render`]**: Diagnostic, gutter icon, code lens and ruler renderers plus orchestration
//! - **[`config`]**: Configuration loading and validation

pub mod cache;
pub mod config;
pub mod copilot;
pub mod debounce;
pub mod inspection;
pub mod inspector;
pub mod render;
pub mod symbols;
