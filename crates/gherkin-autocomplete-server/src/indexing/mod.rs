//! Step indexing and querying.
//!
//! A workspace root is indexed into three collections:
//!
//! - **steps**: every step found in feature files, plus scenario names of
//!   features tagged `@ExportScenarios` ([`IndexEntry`]);
//! - **exported snippets**: step-definition methods registered by BSL and
//!   OneScript modules ([`ModuleMethodEntry`]);
//! - **languages**: the natural language of every indexed feature
//!   ([`LanguageInfo`]).
//!
//! Parsing is delegated to a [`FeatureParser`] and a [`ModuleParser`]; the
//! defaults use the `gherkin` crate and a line scanner for method headers.
//! [`IndexRegistry`] owns the per-root indexes and answers queries.

use std::path::PathBuf;

mod feature;
mod module;
mod query;
mod store;

pub use feature::{
    DocumentStep, FeatureChild, FeatureDocument, FeatureParser, GherkinFeatureParser, Tag,
    index_feature_document,
};
pub use module::{
    BslModuleParser, MethodDefinition, MethodTable, ModuleParser, ScriptDialect,
    extract_module_snippets,
};
pub use query::{MatchMode, NAME_QUERY_LIMIT, SNIPPET_QUERY_LIMIT};
pub use store::{BuildHandle, BuildReport, IndexRegistry};

/// What an [`IndexEntry`] was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A step line inside a scenario or background.
    Step,
    /// The name of a scenario in a feature tagged `@ExportScenarios`.
    ExportedScenario,
}

/// A step (or exported scenario name) indexed from a feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Lowercased display name, used to de-duplicate results.
    pub id: String,
    /// Text offered to the user; literals are replaced by empty sentinels.
    pub name: String,
    /// Canonical matching key.
    pub snippet: String,
    /// The original step text or scenario name.
    pub description: String,
    /// Feature file the entry came from.
    pub filename: PathBuf,
    /// 1-based line of the step or scenario header.
    pub line: u32,
    /// 1-based last line of the entry.
    pub endline: u32,
    /// Whether the entry is an exported scenario.
    pub is_exported: bool,
    /// Kind of source element.
    pub kind: EntryKind,
}

/// An exported step-definition method found in a script module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMethodEntry {
    /// Method name as declared.
    pub name: String,
    /// `true` for procedures, `false` for functions.
    pub is_procedure: bool,
    /// Whether the method carries the export marker.
    pub is_exported: bool,
    /// 1-based line of the method header.
    pub line: u32,
    /// 1-based line of the method's end marker.
    pub endline: u32,
    /// Compilation directive preceding the method, if any.
    pub context: Option<String>,
    /// Comment block preceding the method.
    pub description: String,
    /// Module file the method was found in.
    pub filename: PathBuf,
}

/// The natural language of an indexed feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageInfo {
    /// Feature file path.
    pub filename: PathBuf,
    /// Gherkin language tag such as `en` or `ru`.
    pub language: String,
}

/// Errors that can occur while indexing a feature file.
#[derive(Debug, thiserror::Error)]
pub enum FeatureIndexError {
    /// Failed to read the source `.feature` file.
    #[error("failed to read feature file: {0}")]
    Read(#[from] std::io::Error),
    /// Failed to parse the `.feature` file with the Gherkin parser.
    #[error("failed to parse feature file: {0}")]
    Parse(#[from] gherkin::ParseError),
}

/// Errors that can occur while indexing a script module.
#[derive(Debug, thiserror::Error)]
pub enum ModuleIndexError {
    /// Failed to read the module source.
    #[error("failed to read module: {0}")]
    Read(#[from] std::io::Error),
    /// A method header had no matching end marker.
    #[error("method '{name}' starting at line {line} is never closed")]
    UnterminatedMethod {
        /// Method name.
        name: String,
        /// 1-based header line.
        line: u32,
    },
}

/// Errors surfaced by the index store itself.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The background build task panicked or was cancelled.
    #[error("index build task failed: {0}")]
    BuildTask(#[from] tokio::task::JoinError),

    /// The dedicated build thread panicked.
    #[error("index build thread panicked")]
    BuildThread,
}
