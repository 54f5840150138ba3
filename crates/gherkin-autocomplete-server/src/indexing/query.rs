//! Queries over a root's collections.
//!
//! Every query is case-insensitive and scoped to the root owning the file it
//! is asked for. User text is escaped before it becomes part of a pattern, so
//! it only ever matches literally. Results are sorted on the queried field
//! and capped.

use std::path::Path;
use std::sync::Arc;

use gherkin_snippets::{canonical_form, placeholder_form};
use regex::{Regex, RegexBuilder, RegexSetBuilder};
use tracing::{debug, warn};

use super::feature::index_feature_source;
use super::store::RootIndex;
use super::{
    FeatureDocument, FeatureIndexError, IndexEntry, IndexRegistry, LanguageInfo,
    ModuleMethodEntry,
};

/// Maximum number of results for queries over entry names.
pub const NAME_QUERY_LIMIT: usize = 50;

/// Maximum number of results for queries over canonical snippets.
pub const SNIPPET_QUERY_LIMIT: usize = 15;

/// Anchoring of a prefix query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchMode {
    /// Accept any text after the match; when `false` the pattern must reach
    /// the end of the field.
    pub match_whole: bool,
    /// Match anywhere in the field rather than only at its start.
    pub lazy: bool,
}

impl Default for MatchMode {
    fn default() -> Self {
        Self {
            match_whole: true,
            lazy: false,
        }
    }
}

impl MatchMode {
    fn anchor(self, body: &str) -> String {
        let prefix = if self.lazy { "" } else { "^" };
        let suffix = if self.match_whole { "" } else { "$" };
        format!("{prefix}{body}{suffix}")
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(pattern, error = %err, "invalid query pattern");
            None
        }
    }
}

/// Pattern matching either the canonical form of `text`, or its words in
/// order with anything in between.
fn snippet_pattern(text: &str) -> String {
    let canonical = regex::escape(&canonical_form(text));
    let fuzzy = placeholder_form(text)
        .split_whitespace()
        .map(canonical_form)
        .filter(|word| !word.is_empty())
        .map(|word| regex::escape(&word))
        .collect::<Vec<_>>()
        .join(".*");
    format!("({canonical})|({fuzzy})")
}

fn sorted_by<T, K>(mut items: Vec<T>, limit: usize, key: impl Fn(&T) -> &K) -> Vec<T>
where
    K: Ord + ?Sized,
{
    items.sort_by(|a, b| key(a).cmp(key(b)));
    items.truncate(limit);
    items
}

impl IndexRegistry {
    /// The ready index owning `file`, building it first if needed.
    fn ready_root(&self, file: &Path) -> Option<Arc<RootIndex>> {
        if !self.ensure_built(file) {
            return None;
        }
        let root = self.services.host.workspace_root(file)?;
        self.root_index(&root)
    }

    fn select_steps(
        &self,
        file: &Path,
        filter: impl Fn(&IndexEntry) -> bool,
    ) -> Vec<IndexEntry> {
        let Some(index) = self.ready_root(file) else {
            return Vec::new();
        };
        index
            .read()
            .steps
            .iter()
            .filter(|entry| filter(entry))
            .cloned()
            .collect()
    }

    /// Entries whose name starts with `name`.
    ///
    /// See [`MatchMode`] for anchoring.
    #[must_use]
    pub fn query(&self, file: &Path, name: &str, mode: MatchMode) -> Vec<IndexEntry> {
        let Some(regex) = compile(&mode.anchor(&regex::escape(name))) else {
            return Vec::new();
        };
        let found = self.select_steps(file, |entry| regex.is_match(&entry.name));
        sorted_by(found, NAME_QUERY_LIMIT, |entry| entry.name.as_str())
    }

    /// Entries with a non-empty name containing every space-separated word
    /// of `words`, in any order.
    #[must_use]
    pub fn query_any(&self, file: &Path, words: &str) -> Vec<IndexEntry> {
        let patterns: Vec<_> = words
            .split(' ')
            .filter(|word| !word.is_empty())
            .map(regex::escape)
            .collect();
        let set = match RegexSetBuilder::new(&patterns).case_insensitive(true).build() {
            Ok(set) => set,
            Err(err) => {
                warn!(error = %err, "invalid query pattern");
                return Vec::new();
            }
        };
        let found = self.select_steps(file, |entry| {
            !entry.name.is_empty() && set.matches(&entry.name).matched_all()
        });
        sorted_by(found, NAME_QUERY_LIMIT, |entry| entry.name.as_str())
    }

    /// Step entries whose snippet contains the canonical form of `text`, or
    /// its words in order.
    ///
    /// Exported scenarios never match here.
    #[must_use]
    pub fn query_snippet(&self, file: &Path, text: &str) -> Vec<IndexEntry> {
        let pattern = snippet_pattern(text);
        debug!(pattern, "snippet query");
        let Some(regex) = compile(&pattern) else {
            return Vec::new();
        };
        let found = self.select_steps(file, |entry| {
            !entry.is_exported && regex.is_match(&entry.snippet)
        });
        sorted_by(found, SNIPPET_QUERY_LIMIT, |entry| entry.snippet.as_str())
    }

    /// Exported scenarios whose snippet equals the canonical form of `text`.
    ///
    /// Exported names always match in full; only `mode.lazy` applies.
    #[must_use]
    pub fn query_exported_snippet(
        &self,
        file: &Path,
        text: &str,
        mode: MatchMode,
    ) -> Vec<IndexEntry> {
        let mode = MatchMode {
            match_whole: false,
            ..mode
        };
        let pattern = mode.anchor(&regex::escape(&canonical_form(text)));
        let Some(regex) = compile(&pattern) else {
            return Vec::new();
        };
        let found = self.select_steps(file, |entry| {
            entry.is_exported && regex.is_match(&entry.snippet)
        });
        sorted_by(found, SNIPPET_QUERY_LIMIT, |entry| entry.snippet.as_str())
    }

    /// Module step methods whose name contains `word`.
    #[must_use]
    pub fn query_module_snippets(&self, file: &Path, word: &str) -> Vec<ModuleMethodEntry> {
        let Some(index) = self.ready_root(file) else {
            return Vec::new();
        };
        let needle = word.to_lowercase();
        let found: Vec<ModuleMethodEntry> = index
            .read()
            .exported_snippets
            .iter()
            .filter(|entry| entry.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        sorted_by(found, NAME_QUERY_LIMIT, |entry| entry.name.as_str())
    }

    /// Steps of an unsaved document matching the canonical form of `word`.
    ///
    /// `source` is parsed on the fly; nothing is stored. Results keep
    /// document order.
    #[must_use]
    pub fn local_entries(
        &self,
        file: &Path,
        word: &str,
        source: &str,
        mode: MatchMode,
    ) -> Vec<IndexEntry> {
        let entries = match index_feature_source(
            self.services.feature_parser.as_ref(),
            file,
            source,
        ) {
            Ok((entries, _)) => entries,
            Err(err) => {
                debug!(path = %file.display(), error = %err, "unsaved document does not parse");
                return Vec::new();
            }
        };
        let Some(regex) = compile(&mode.anchor(&regex::escape(&canonical_form(word)))) else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter(|entry| regex.is_match(&entry.snippet))
            .collect()
    }

    /// Parse `source` with the registry's feature parser, without indexing
    /// it.
    ///
    /// # Errors
    ///
    /// Returns the parser's error when `source` is not valid Gherkin.
    pub fn parse_document(&self, source: &str) -> Result<FeatureDocument, FeatureIndexError> {
        self.services.feature_parser.parse(source)
    }

    /// The language recorded for `file`.
    ///
    /// Before its root is ready every file reads as `en`. Once ready, `None`
    /// means the file was not indexed.
    #[must_use]
    pub fn language_info(&self, file: &Path) -> Option<LanguageInfo> {
        let Some(index) = self.ready_root(file) else {
            return Some(LanguageInfo {
                filename: file.to_path_buf(),
                language: gherkin_snippets::DEFAULT_LANGUAGE.to_owned(),
            });
        };
        index.read().languages.get(file).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MatchMode::default(), "^abc")]
    #[case(MatchMode { match_whole: false, lazy: false }, "^abc$")]
    #[case(MatchMode { match_whole: true, lazy: true }, "abc")]
    #[case(MatchMode { match_whole: false, lazy: true }, "abc$")]
    fn match_mode_anchoring(#[case] mode: MatchMode, #[case] expected: &str) {
        assert_eq!(mode.anchor("abc"), expected);
    }

    #[test]
    fn snippet_pattern_combines_canonical_and_word_forms() {
        assert_eq!(
            snippet_pattern("I have <n> items"),
            "(Ihaveitems)|(I.*have.*items)"
        );
    }

    #[rstest]
    #[case("I add (1+2)", r"(Iadd\(1\+2\))|(I.*add.*\(1\+2\))")]
    #[case("", "()|()")]
    fn snippet_pattern_escapes_user_text(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(snippet_pattern(text), expected);
    }

    #[test]
    fn sorting_happens_before_the_cap() {
        let items = vec!["d", "a", "c", "b"];
        assert_eq!(sorted_by(items, 2, |s| *s), vec!["a", "b"]);
    }
}
