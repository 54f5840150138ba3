//! Step-text normalisation and alignment for gherkin-autocomplete.
//!
//! Feature steps and step definitions are matched on a normalised key rather
//! than on raw text, so that quoted values, `<placeholder>` tokens and spacing
//! do not prevent a match. This crate provides:
//!
//! - a single filler-span lexer recognising whitespace, quoted literals and
//!   placeholders ([`filler_span_at`], [`literal_span_at`]);
//! - the canonical and placeholder normal forms ([`to_snippet`]);
//! - alignment of a canonical prefix back onto candidate text
//!   ([`reverse_index`]);
//! - splitting raw step lines at a known keyword ([`split_with_keyword`]),
//!   with localised keyword tables as a fallback ([`split_step_line`]).

mod align;
mod keyword;
mod lexer;
mod normalize;

pub use align::{is_word_char, reverse_index, unmatched_suffix};
pub use keyword::{
    DEFAULT_LANGUAGE, StepLine, language_directive, split_step_line, split_with_keyword,
    step_keywords,
};
pub use lexer::{FillerSpan, SpanKind, filler_span_at, literal_span_at};
pub use normalize::{SnippetForm, canonical_form, placeholder_form, to_snippet};
