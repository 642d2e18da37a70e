use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lintel_config::{LintMode, Settings};
use lintel_daemon::{DaemonConfig, DaemonEvent, DebugFlag, Logger, ManualClock, MemorySink, MonotonicClock};
use pretty_assertions::assert_eq;

use super::*;
use crate::diagnostics::{Diagnostic, Mark, MarkKind, Position};

#[derive(Default)]
struct ScriptedEngine {
	reports: Mutex<HashMap<DocumentId, LintReport>>,
	runs: AtomicUsize,
}

impl ScriptedEngine {
	fn set(&self, doc: DocumentId, report: LintReport) {
		self.reports.lock().insert(doc, report);
	}

	fn runs(&self) -> usize {
		self.runs.load(Ordering::SeqCst)
	}
}

impl LintEngine for ScriptedEngine {
	fn lint(&self, doc: DocumentId) -> Option<LintReport> {
		self.runs.fetch_add(1, Ordering::SeqCst);
		self.reports.lock().get(&doc).cloned()
	}
}

fn doc(raw: u64) -> DocumentId {
	DocumentId::new(raw)
}

fn report(line: usize, messages: &[&str]) -> LintReport {
	let mut report = LintReport::default();
	for (col, msg) in messages.iter().enumerate() {
		report.errors.push(line, Diagnostic::error(col, *msg));
		report.highlights.add(Mark {
			line,
			start: col,
			end: col + 1,
			kind: MarkKind::Error,
		});
	}
	report
}

fn settings(mode: LintMode) -> Arc<SettingsStore> {
	Arc::new(SettingsStore::new(Settings {
		lint_mode: mode,
		..Settings::default()
	}))
}

fn session_with(clock: Arc<dyn lintel_daemon::Clock>, sink: &MemorySink, mode: LintMode) -> (LintSession, Arc<ScriptedEngine>) {
	let engine = Arc::new(ScriptedEngine::default());
	let logger = Logger::new("lintel", DebugFlag::default(), Arc::new(sink.clone()));
	let daemon = Daemon::new(DaemonConfig::default(), clock, logger);
	let session = LintSession::new(daemon, settings(mode), engine.clone());
	(session, engine)
}

fn new_session(sink: &MemorySink, mode: LintMode) -> (LintSession, Arc<ScriptedEngine>) {
	session_with(Arc::new(MonotonicClock::new()), sink, mode)
}

#[tokio::test]
async fn hit_lints_on_daemon_thread() {
	let sink = MemorySink::new();
	let (session, engine) = new_session(&sink, LintMode::Background);
	engine.set(doc(1), report(3, &["unused import", "undefined name"]));
	let mut events = session.daemon().subscribe();
	session.start().unwrap();

	let at = session.hit(doc(1), 42).expect("non-empty document is queued");
	let evt = tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
	assert_eq!(evt, DaemonEvent::Dispatched { doc: doc(1), at });

	assert_eq!(session.errors(doc(1)).total(), 2);
	assert_eq!(session.highlights(doc(1)).gutter_lines().collect::<Vec<_>>(), vec![(3, MarkKind::Error)]);
	assert_eq!(
		session.status_text(doc(1), Some(3)).as_deref(),
		Some("1-2 of 2 errors: unused import; undefined name")
	);
	assert_eq!(session.status_text(doc(1), Some(0)).as_deref(), Some("2 errors"));

	session.shutdown();
}

#[test]
fn result_older_than_latest_hit_is_discarded() {
	let docs = Documents::default();
	docs.record_hit(doc(1), Timestamp::from_millis(100));
	docs.record_hit(doc(1), Timestamp::from_millis(250));

	assert!(!docs.apply(doc(1), Some(Timestamp::from_millis(100)), report(0, &["old"])));
	assert_eq!(docs.report(doc(1)), None);

	assert!(docs.apply(doc(1), Some(Timestamp::from_millis(250)), report(0, &["new"])));
	assert_eq!(docs.report(doc(1)).map(|r| r.errors.total()), Some(1));
}

#[test]
fn late_hit_with_older_timestamp_does_not_rewind() {
	let docs = Documents::default();
	docs.record_hit(doc(1), Timestamp::from_millis(300));
	docs.record_hit(doc(1), Timestamp::from_millis(200));

	assert!(!docs.apply(doc(1), Some(Timestamp::from_millis(200)), LintReport::default()));
}

#[test]
fn result_for_closed_document_is_dropped() {
	let clock = Arc::new(ManualClock::new());
	let sink = MemorySink::new();
	let (session, engine) = session_with(clock.clone(), &sink, LintMode::Background);
	engine.set(doc(4), report(1, &["x"]));

	let at = session.hit(doc(4), 10).unwrap();
	session.on_close(doc(4));

	assert!(!session.docs.run(engine.as_ref(), doc(4), Some(at)));
	assert!(session.errors(doc(4)).is_empty());
}

#[test]
fn empty_document_clears_errors_without_queueing() {
	let sink = MemorySink::new();
	let (session, engine) = new_session(&sink, LintMode::SaveOnly);
	engine.set(doc(2), report(0, &["syntax error"]));
	assert!(session.on_post_save(doc(2)).linted);
	assert_eq!(session.errors(doc(2)).total(), 1);

	assert_eq!(session.hit(doc(2), 0), None);
	assert!(session.errors(doc(2)).is_empty());
	assert_eq!(session.status_text(doc(2), Some(0)), None);
}

#[test]
fn modifications_only_hit_in_background_mode() {
	let sink = MemorySink::new();
	let (session, _) = new_session(&sink, LintMode::LoadSave);
	assert_eq!(session.on_modified(doc(1), 5), None);

	session.settings().replace(Settings {
		lint_mode: LintMode::Background,
		..Settings::default()
	});
	assert!(session.on_modified(doc(1), 5).is_some());
}

#[test]
fn activation_hits_only_the_first_time() {
	let sink = MemorySink::new();
	let (session, engine) = new_session(&sink, LintMode::LoadSave);
	assert!(session.on_activated(doc(9), 5).is_some());
	assert_eq!(session.on_activated(doc(9), 5), None, "already hit, no result needed yet");

	assert!(session.on_activated(doc(10), 5).is_some());
	assert!(!session.docs.run(engine.as_ref(), doc(10), None), "engine has no report for doc 10");
	assert_eq!(session.on_activated(doc(10), 5), None);

	session.on_close(doc(9));
	assert!(session.on_activated(doc(9), 5).is_some());

	let (manual, _) = new_session(&sink, LintMode::Manual);
	assert_eq!(manual.on_activated(doc(9), 5), None);
}

#[tokio::test]
async fn hit_all_relints_known_documents() {
	let sink = MemorySink::new();
	let (session, engine) = new_session(&sink, LintMode::Background);
	engine.set(doc(1), report(0, &["first"]));
	engine.set(doc(2), report(1, &["second"]));
	let mut events = session.daemon().subscribe();
	session.start().unwrap();

	session.hit(doc(1), 10);
	session.hit(doc(2), 10);
	let mut dispatched = Vec::new();
	for _ in 0..2 {
		match tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap() {
			DaemonEvent::Dispatched { doc, .. } => dispatched.push(doc),
			other => panic!("unexpected event {other:?}"),
		}
	}
	dispatched.sort();
	assert_eq!(dispatched, vec![doc(1), doc(2)]);
	assert_eq!(session.errors(doc(2)).total(), 1);

	session.hit_all(|d| if d == doc(2) { 0 } else { 10 });
	assert!(session.errors(doc(2)).is_empty(), "emptied document is cleared at once");

	let evt = tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
	assert!(matches!(evt, DaemonEvent::Dispatched { doc: d, .. } if d == doc(1)));
	let quiet = tokio::time::timeout(lintel_daemon::MIN_DELAY * 3, events.recv()).await;
	assert!(quiet.is_err(), "emptied document must not be queued");
	assert_eq!(engine.runs(), 3);
	assert_eq!(session.errors(doc(1)).total(), 1);

	session.shutdown();
}

#[test]
fn error_navigation_follows_wrap_find() {
	let sink = MemorySink::new();
	let (session, engine) = new_session(&sink, LintMode::SaveOnly);
	let mut lint = report(1, &["a"]);
	lint.highlights.extend(report(6, &["b"]).highlights);
	engine.set(doc(5), lint);
	session.on_post_save(doc(5));

	let first = Mark {
		line: 1,
		start: 0,
		end: 1,
		kind: MarkKind::Error,
	};
	let last = Mark { line: 6, ..first };
	assert_eq!(session.next_error(doc(5), Position::new(0, 0)), Some(first));
	assert_eq!(session.next_error(doc(5), Position::new(6, 3)), Some(first));
	assert_eq!(session.previous_error(doc(5), Position::new(1, 0)), Some(last));

	session.settings().replace(Settings {
		lint_mode: LintMode::SaveOnly,
		wrap_find: false,
		..Settings::default()
	});
	assert_eq!(session.next_error(doc(5), Position::new(6, 3)), None);
	assert_eq!(session.previous_error(doc(5), Position::new(1, 0)), None);
	assert_eq!(session.next_error(doc(99), Position::default()), None);
}

#[test]
fn dropped_session_stops_following_shared_settings() {
	let store = settings(LintMode::Background);
	let sink = MemorySink::new();
	let make = || {
		let logger = Logger::new("lintel", DebugFlag::default(), Arc::new(sink.clone()));
		let daemon = Daemon::new(DaemonConfig::default(), Arc::new(MonotonicClock::new()), logger);
		LintSession::new(daemon, Arc::clone(&store), Arc::new(ScriptedEngine::default()))
	};
	let kept = make();
	let dropped = make();
	let dropped_flag = dropped.daemon().logger().debug_flag().clone();
	drop(dropped);

	store.replace(Settings {
		debug: true,
		..Settings::default()
	});
	assert!(kept.daemon().logger().debug_flag().is_enabled());
	assert!(!dropped_flag.is_enabled());
}

#[test]
fn save_lints_synchronously_per_mode() {
	let sink = MemorySink::new();
	let (session, engine) = new_session(&sink, LintMode::Background);
	engine.set(doc(3), report(2, &["line too long"]));

	assert_eq!(session.on_post_save(doc(3)), SaveOutcome::default());
	assert_eq!(engine.runs(), 0);

	session.settings().replace(Settings {
		lint_mode: LintMode::SaveOnly,
		show_errors_on_save: true,
		..Settings::default()
	});
	assert_eq!(
		session.on_post_save(doc(3)),
		SaveOutcome {
			linted: true,
			show_all_errors: true,
		}
	);
	assert_eq!(engine.runs(), 1);
	assert_eq!(session.status_text(doc(3), Some(2)).as_deref(), Some("Error: line too long"));

	session.settings().replace(Settings {
		lint_mode: LintMode::Manual,
		show_errors_on_save: true,
		..Settings::default()
	});
	assert_eq!(session.on_post_save(doc(3)), SaveOutcome::default());
}

#[test]
fn debug_flag_follows_settings() {
	let sink = MemorySink::new();
	let (session, _) = new_session(&sink, LintMode::Background);
	let flag = session.daemon().logger().debug_flag().clone();
	assert!(!flag.is_enabled());

	session.settings().replace(Settings {
		debug: true,
		..Settings::default()
	});
	assert!(flag.is_enabled());

	session.daemon().debug("visible");
	assert!(sink.contains("lintel: visible"));
}

#[test]
fn reload_settings_updates_mode_and_reports_errors() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("lintel.json");
	std::fs::write(&path, r#"{"default": {"lint_mode": "background"}, "user": {"lint_mode": "manual"}}"#).unwrap();

	let sink = MemorySink::new();
	let (session, _) = new_session(&sink, LintMode::Background);
	session.reload_settings(&path).unwrap();
	assert_eq!(session.settings().current().lint_mode, LintMode::Manual);

	std::fs::write(&path, "{ not json").unwrap();
	assert!(matches!(session.reload_settings(&path), Err(crate::LintError::Config(_))));
	assert_eq!(session.settings().current().lint_mode, LintMode::Manual);
}

#[test]
fn gutter_fallback_is_reported_through_daemon_log() {
	let packages = tempfile::tempdir().unwrap();
	std::fs::create_dir_all(packages.path().join("lintel/gutter-themes/Default")).unwrap();

	let sink = MemorySink::new();
	let (session, _) = new_session(&sink, LintMode::Background);
	session.settings().replace(Settings {
		gutter_theme: "Hexagon".to_string(),
		..Settings::default()
	});

	let marks = session.update_gutter_marks(packages.path(), "lintel");
	assert!(marks.error.ends_with("error.png"));
	assert!(sink.contains("lintel: cannot find the gutter theme 'Hexagon', using the default"));
}

#[test]
fn start_after_shutdown_fails() {
	let sink = MemorySink::new();
	let (session, _) = new_session(&sink, LintMode::Background);
	session.shutdown();
	assert!(matches!(session.start(), Err(crate::LintError::Daemon(_))));
}
