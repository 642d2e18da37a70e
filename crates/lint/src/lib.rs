//! Lint session for lintel.
//!
//! Ties the debounce daemon from `lintel-daemon` to a [`LintEngine`], keeps
//! the latest [`LintReport`] per document and derives editor-facing output
//! such as status bar text and gutter marks.

pub mod diagnostics;
pub mod engine;
pub mod error;
mod session;
pub mod status;

pub use diagnostics::{Diagnostic, ErrorMap, HighlightSet, Mark, MarkKind, Position};
pub use engine::{LintEngine, LintReport};
pub use error::{LintError, Result};
pub use session::{LintSession, SaveOutcome};
pub use status::status_text;
