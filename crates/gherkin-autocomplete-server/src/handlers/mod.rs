//! LSP request and notification handlers.
//!
//! Lifecycle handlers set up workspace folders and index settings, text
//! document handlers keep the open-document cache and the index current, and
//! the completion handler answers step suggestions from the index.

mod completion;
mod lifecycle;
mod text_document;
mod workspace;

pub use completion::{completion_items, handle_completion};
pub use lifecycle::{handle_initialise, handle_initialised, handle_shutdown};
pub use text_document::{
    handle_did_change_text_document, handle_did_close_text_document,
    handle_did_open_text_document, handle_did_save_text_document,
};
pub use workspace::handle_did_change_configuration;
