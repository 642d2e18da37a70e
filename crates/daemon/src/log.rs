use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Destination for prefixed diagnostic lines.
pub trait LogSink: Send + Sync + 'static {
	fn write_line(&self, line: &str);
}

/// Forwards lines to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
	fn write_line(&self, line: &str) {
		tracing::info!(target: "lintel", "{line}");
	}
}

/// Keeps lines in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
	lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn lines(&self) -> Vec<String> {
		self.lines.lock().clone()
	}

	/// Returns true if any line contains `needle`.
	pub fn contains(&self, needle: &str) -> bool {
		self.lines.lock().iter().any(|line| line.contains(needle))
	}
}

impl LogSink for MemorySink {
	fn write_line(&self, line: &str) {
		self.lines.lock().push(line.to_string());
	}
}

/// Shared switch gating [`Logger::debug`] output.
#[derive(Debug, Default, Clone)]
pub struct DebugFlag(Arc<AtomicBool>);

impl DebugFlag {
	pub fn new(enabled: bool) -> Self {
		Self(Arc::new(AtomicBool::new(enabled)))
	}

	pub fn set(&self, enabled: bool) {
		self.0.store(enabled, Ordering::Release);
	}

	pub fn is_enabled(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

/// Line logger prefixing every message with the plugin name.
#[derive(Clone)]
pub struct Logger {
	name: Arc<str>,
	debug: DebugFlag,
	sink: Arc<dyn LogSink>,
}

impl fmt::Debug for Logger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Logger").field("name", &self.name).field("debug", &self.debug.is_enabled()).finish_non_exhaustive()
	}
}

impl Logger {
	pub fn new(name: &str, debug: DebugFlag, sink: Arc<dyn LogSink>) -> Self {
		Self {
			name: Arc::from(name),
			debug,
			sink,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn debug_flag(&self) -> &DebugFlag {
		&self.debug
	}

	/// Writes `msg` unconditionally.
	pub fn printf(&self, msg: impl fmt::Display) {
		self.sink.write_line(&format!("{}: {}", self.name, msg));
	}

	/// Writes `msg` only while the debug flag is set.
	pub fn debug(&self, msg: impl fmt::Display) {
		if self.debug.is_enabled() {
			self.printf(msg);
		}
	}
}
