//! Editor-facing lint session.
//!
//! Editor events call into [`LintSession`]; document activity is turned into
//! daemon hits, and the daemon's dispatch runs the [`LintEngine`] on the
//! daemon thread. A result is only kept if no newer hit was recorded for the
//! document while the lint ran.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lintel_config::{GutterMarks, LintMode, ListenerId, SettingsStore, resolve_gutter_marks};
use lintel_daemon::{Daemon, DocumentId, Timestamp};
use parking_lot::Mutex;

use crate::diagnostics::{ErrorMap, HighlightSet, Mark, Position};
use crate::engine::{LintEngine, LintReport};
use crate::error::Result;
use crate::status::status_text;

/// What the editor should do after a save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
	/// A lint ran synchronously and its result was stored.
	pub linted: bool,
	/// The editor should open its all-errors panel.
	pub show_all_errors: bool,
}

#[derive(Debug, Default)]
struct DocumentTable {
	last_hits: HashMap<DocumentId, Timestamp>,
	results: HashMap<DocumentId, LintReport>,
	/// Documents hit or linted at least once since they were opened.
	linted: HashSet<DocumentId>,
}

#[derive(Debug, Default)]
struct Documents {
	table: Mutex<DocumentTable>,
}

impl Documents {
	fn record_hit(&self, doc: DocumentId, at: Timestamp) {
		let mut table = self.table.lock();
		let last = table.last_hits.entry(doc).or_insert(at);
		*last = (*last).max(at);
		table.linted.insert(doc);
	}

	fn clear(&self, doc: DocumentId) {
		let mut table = self.table.lock();
		table.results.remove(&doc);
		table.linted.insert(doc);
	}

	fn forget(&self, doc: DocumentId) {
		let mut table = self.table.lock();
		table.last_hits.remove(&doc);
		table.results.remove(&doc);
		table.linted.remove(&doc);
	}

	fn was_linted(&self, doc: DocumentId) -> bool {
		self.table.lock().linted.contains(&doc)
	}

	fn known(&self) -> Vec<DocumentId> {
		let mut docs: Vec<_> = self.table.lock().linted.iter().copied().collect();
		docs.sort();
		docs
	}

	/// Runs `engine` for `doc` and stores the report unless it is out of date.
	///
	/// `hit_time` is `None` for lints that bypass the daemon.
	fn run(&self, engine: &dyn LintEngine, doc: DocumentId, hit_time: Option<Timestamp>) -> bool {
		let Some(report) = engine.lint(doc) else {
			tracing::debug!(%doc, "lint.document_gone");
			return false;
		};
		self.apply(doc, hit_time, report)
	}

	fn apply(&self, doc: DocumentId, hit_time: Option<Timestamp>, report: LintReport) -> bool {
		let mut table = self.table.lock();
		if let Some(at) = hit_time {
			match table.last_hits.get(&doc) {
				Some(last) if *last > at => {
					tracing::debug!(%doc, %at, last = %last, "lint.result_outdated");
					return false;
				}
				None => {
					tracing::debug!(%doc, %at, "lint.result_for_closed_document");
					return false;
				}
				Some(_) => {}
			}
		}
		tracing::trace!(%doc, errors = report.errors.total(), "lint.result_stored");
		table.results.insert(doc, report);
		table.linted.insert(doc);
		true
	}

	fn report(&self, doc: DocumentId) -> Option<LintReport> {
		self.table.lock().results.get(&doc).cloned()
	}
}

/// Connects editor events, settings, the daemon and a lint engine.
///
/// Several sessions may share one [`SettingsStore`]; each registers a
/// settings listener that is removed again when the session is dropped.
pub struct LintSession {
	daemon: Daemon,
	settings: Arc<SettingsStore>,
	engine: Arc<dyn LintEngine>,
	docs: Arc<Documents>,
	listener: ListenerId,
}

impl Drop for LintSession {
	fn drop(&mut self) {
		self.settings.remove_listener(self.listener);
	}
}

impl std::fmt::Debug for LintSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LintSession")
			.field("daemon", &self.daemon)
			.field("settings", &self.settings)
			.field("docs", &self.docs)
			.finish_non_exhaustive()
	}
}

impl LintSession {
	/// Builds a session. The daemon's debug flag follows `settings.debug` from now on.
	pub fn new(daemon: Daemon, settings: Arc<SettingsStore>, engine: Arc<dyn LintEngine>) -> Self {
		let flag = daemon.logger().debug_flag().clone();
		let listener = settings.on_change(move |s| flag.set(s.debug));
		Self {
			daemon,
			settings,
			engine,
			docs: Arc::new(Documents::default()),
			listener,
		}
	}

	/// Starts the daemon with this session's dispatch handler.
	pub fn start(&self) -> Result<()> {
		let docs = Arc::clone(&self.docs);
		let engine = Arc::clone(&self.engine);
		self.daemon.start(move |doc, at| {
			docs.run(engine.as_ref(), doc, Some(at));
		})?;
		Ok(())
	}

	pub fn daemon(&self) -> &Daemon {
		&self.daemon
	}

	pub fn settings(&self) -> &Arc<SettingsStore> {
		&self.settings
	}

	/// Records activity on `doc` and asks the daemon for a lint.
	///
	/// An empty document has nothing to lint: its results are cleared and
	/// nothing is queued.
	pub fn hit(&self, doc: DocumentId, text_len: usize) -> Option<Timestamp> {
		if text_len == 0 {
			self.docs.clear(doc);
			return None;
		}
		let at = self.daemon.hit(doc);
		self.docs.record_hit(doc, at);
		Some(at)
	}

	/// Hits every document this session has seen.
	pub fn hit_all(&self, text_len: impl Fn(DocumentId) -> usize) {
		for doc in self.docs.known() {
			self.hit(doc, text_len(doc));
		}
	}

	pub fn on_modified(&self, doc: DocumentId, text_len: usize) -> Option<Timestamp> {
		if !self.settings.current().lint_mode.lints_on_modify() {
			return None;
		}
		self.hit(doc, text_len)
	}

	/// Lints a document the first time it gains focus.
	pub fn on_activated(&self, doc: DocumentId, text_len: usize) -> Option<Timestamp> {
		if self.docs.was_linted(doc) || !self.settings.current().lint_mode.lints_on_activate() {
			return None;
		}
		self.hit(doc, text_len)
	}

	/// Lints synchronously on the caller's thread when the lint mode asks for it.
	pub fn on_post_save(&self, doc: DocumentId) -> SaveOutcome {
		let settings = self.settings.current();
		let linted = settings.lint_mode.lints_on_save() && self.docs.run(self.engine.as_ref(), doc, None);
		SaveOutcome {
			linted,
			show_all_errors: settings.show_errors_on_save && settings.lint_mode != LintMode::Manual,
		}
	}

	pub fn on_close(&self, doc: DocumentId) {
		self.docs.forget(doc);
	}

	pub fn errors(&self, doc: DocumentId) -> ErrorMap {
		self.docs.report(doc).map(|r| r.errors).unwrap_or_default()
	}

	pub fn highlights(&self, doc: DocumentId) -> HighlightSet {
		self.docs.report(doc).map(|r| r.highlights).unwrap_or_default()
	}

	/// Next marked region after `point`, honoring `wrap_find`.
	pub fn next_error(&self, doc: DocumentId, point: Position) -> Option<Mark> {
		let wrap = self.settings.current().wrap_find;
		self.highlights(doc).next_mark(point, wrap).copied()
	}

	/// Previous marked region before `point`, honoring `wrap_find`.
	pub fn previous_error(&self, doc: DocumentId, point: Position) -> Option<Mark> {
		let wrap = self.settings.current().wrap_find;
		self.highlights(doc).previous_mark(point, wrap).copied()
	}

	/// Status bar text for `doc` with the cursor on `line`.
	pub fn status_text(&self, doc: DocumentId, line: Option<usize>) -> Option<String> {
		status_text(&self.errors(doc), line)
	}

	/// Resolves the configured gutter theme, reporting fallbacks through the daemon log.
	pub fn update_gutter_marks(&self, packages: &Path, plugin_dir: &str) -> GutterMarks {
		let theme = self.settings.current().gutter_theme.clone();
		let resolution = resolve_gutter_marks(packages, plugin_dir, &theme);
		if let Some(notice) = &resolution.notice {
			self.daemon.printf(notice);
		}
		resolution.marks
	}

	/// Reloads settings from `path`; listeners (the debug flag included) see the new values.
	pub fn reload_settings(&self, path: &Path) -> Result<()> {
		self.settings.reload_from(path)?;
		self.daemon.debug(format_args!("settings reloaded from {}", path.display()));
		Ok(())
	}

	/// Writes a copy of the color scheme with the mark styles to `<packages>/User/`.
	///
	/// Returns the preference value to switch to, or `None` if `scheme` is already styled.
	pub fn update_color_scheme(&self, packages: &Path, scheme_path: &Path, scheme: &str) -> Result<Option<PathBuf>> {
		let amended = lintel_config::color_scheme::write_amended_scheme(packages, scheme_path, scheme)?;
		if let Some(pref) = &amended {
			self.daemon.debug(format_args!("color scheme amended: {}", pref.display()));
		}
		Ok(amended)
	}

	pub fn shutdown(&self) {
		self.daemon.shutdown();
	}
}

#[cfg(test)]
mod tests;
