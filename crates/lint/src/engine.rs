use lintel_daemon::DocumentId;

use crate::diagnostics::{ErrorMap, HighlightSet};

/// Output of one lint pass over a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
	pub errors: ErrorMap,
	pub highlights: HighlightSet,
}

/// Runs the configured linters over a document's current contents.
///
/// Called on the daemon thread, and on the caller's thread for on-save lints.
pub trait LintEngine: Send + Sync + 'static {
	/// Returns `None` when the document no longer exists.
	fn lint(&self, doc: DocumentId) -> Option<LintReport>;
}

impl<F> LintEngine for F
where
	F: Fn(DocumentId) -> Option<LintReport> + Send + Sync + 'static,
{
	fn lint(&self, doc: DocumentId) -> Option<LintReport> {
		self(doc)
	}
}
