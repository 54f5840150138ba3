//! Language server providing step autocomplete for Gherkin feature files.
//!
//! The server indexes every workspace folder for steps written in `.feature`
//! files and for step definitions registered by BSL (`*.bsl`) and OneScript
//! (`*.os`) modules, then answers `textDocument/completion` with matching
//! steps for the text typed after a step keyword.
//!
//! # Overview
//!
//! The server communicates via JSON-RPC over stdin/stdout and supports:
//!
//! - Per-root step indexes built in the background ([`indexing`])
//! - Step completion with literal and placeholder-insensitive matching
//! - LSP lifecycle management (initialise/shutdown)
//! - Structured logging with environment variable configuration
//!
//! # Configuration
//!
//! The server can be configured via environment variables:
//!
//! - `GHERKIN_AUTOCOMPLETE_LSP_LOG_LEVEL`: Log verbosity (trace, debug, info,
//!   warn, error)
//! - `GHERKIN_AUTOCOMPLETE_LSP_POLL_INTERVAL_MS`: Interval between readiness
//!   checks while waiting for an index build
//!
//! Index locations (`featureLibraries`, `featuresPath`, `srcBslPath`) come
//! from the client's initialisation options or configuration changes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gherkin_autocomplete_server::config::IndexSettings;
//! use gherkin_autocomplete_server::host::StaticHost;
//! use gherkin_autocomplete_server::indexing::{IndexRegistry, MatchMode};
//!
//! let root = std::path::Path::new("/path/to/project");
//! let registry = IndexRegistry::new(Arc::new(StaticHost::new(root, IndexSettings::default())));
//! registry.build_blocking(root);
//! let matches = registry.query_snippet(&root.join("features/new.feature"), "I open");
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod host;
pub mod indexing;
pub mod logging;
pub mod server;
pub mod util;

/// Test support utilities for unit and integration tests.
///
/// This module is hidden from documentation as it's intended for internal
/// test use only.
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;
