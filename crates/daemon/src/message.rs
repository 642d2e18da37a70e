use std::fmt;
use std::time::Duration;

use crate::clock::Timestamp;

/// Stable identity of an open document for the daemon's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

impl From<u64> for DocumentId {
	fn from(raw: u64) -> Self {
		Self(raw)
	}
}

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "doc#{}", self.0)
	}
}

/// Out-of-band instruction for the daemon loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
	/// The embedding plugin was (re)started while the daemon was already running.
	Reload,
	/// Stop the loop after the current message.
	Shutdown,
	/// A tag the daemon does not understand. Logged and ignored.
	Other(String),
}

impl ControlSignal {
	/// Maps a textual tag onto a signal.
	pub fn from_tag(tag: &str) -> Self {
		match tag {
			"reload" => Self::Reload,
			"shutdown" => Self::Shutdown,
			other => Self::Other(other.to_string()),
		}
	}

	pub fn tag(&self) -> &str {
		match self {
			Self::Reload => "reload",
			Self::Shutdown => "shutdown",
			Self::Other(tag) => tag,
		}
	}
}

/// One entry of the request queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMessage {
	/// Lint `doc` once its debounce window passes. `at` orders competing requests.
	Check { doc: DocumentId, at: Timestamp },
	/// Pause consumption for the given duration.
	Delay(Duration),
	Control(ControlSignal),
}

impl QueueMessage {
	pub fn check(doc: DocumentId, at: Timestamp) -> Self {
		Self::Check { doc, at }
	}

	pub fn delay_millis(millis: u64) -> Self {
		Self::Delay(Duration::from_millis(millis))
	}

	pub fn control(tag: &str) -> Self {
		Self::Control(ControlSignal::from_tag(tag))
	}
}
