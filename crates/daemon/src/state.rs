//! Debounce bookkeeping owned by the daemon thread.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use crate::clock::Timestamp;
use crate::message::DocumentId;

/// Outcome of offering a check request to [`DebounceState::accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
	/// No request was pending for the document.
	Accepted,
	/// Replaced an older pending request for the same document.
	Superseded { previous: Timestamp },
	/// A newer request is already pending; this one was dropped.
	Outdated { pending: Timestamp },
	/// Older than the document's last dispatch; dropped.
	Stale { last_run: Timestamp },
}

impl Admission {
	pub fn is_pending(self) -> bool {
		matches!(self, Self::Accepted | Self::Superseded { .. })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRequest {
	at: Timestamp,
	accepted_at: Timestamp,
}

/// Pending set plus the last-run table.
#[derive(Debug)]
pub struct DebounceState {
	min_delay: Duration,
	pending: HashMap<DocumentId, PendingRequest>,
	last_runs: HashMap<DocumentId, Timestamp>,
}

impl DebounceState {
	pub fn new(min_delay: Duration) -> Self {
		Self {
			min_delay,
			pending: HashMap::new(),
			last_runs: HashMap::new(),
		}
	}

	pub fn min_delay(&self) -> Duration {
		self.min_delay
	}

	/// Offers a request received at `now`.
	///
	/// Requests older than the document's last dispatch are stale. Of the
	/// pending requests for one document only the newest survives, and the
	/// debounce window restarts from `now` whenever it is replaced.
	pub fn accept(&mut self, doc: DocumentId, at: Timestamp, now: Timestamp) -> Admission {
		if let Some(&last_run) = self.last_runs.get(&doc) {
			if at < last_run {
				return Admission::Stale { last_run };
			}
		}

		match self.pending.entry(doc) {
			Entry::Vacant(slot) => {
				slot.insert(PendingRequest { at, accepted_at: now });
				Admission::Accepted
			}
			Entry::Occupied(mut slot) => {
				let previous = slot.get().at;
				if at < previous {
					return Admission::Outdated { pending: previous };
				}
				slot.insert(PendingRequest { at, accepted_at: now });
				Admission::Superseded { previous }
			}
		}
	}

	/// Documents whose window has fully elapsed at `now`, oldest request first.
	pub fn due(&self, now: Timestamp) -> Vec<DocumentId> {
		let mut due: Vec<_> = self
			.pending
			.iter()
			.filter(|(_, req)| now.saturating_since(req.accepted_at) >= self.min_delay)
			.map(|(doc, req)| (req.at, *doc))
			.collect();
		due.sort_unstable();
		due.into_iter().map(|(_, doc)| doc).collect()
	}

	/// Moves `doc` out of the pending set, recording `now` as its last run.
	///
	/// Returns the original request timestamp, or `None` if nothing was pending.
	pub fn dispatch(&mut self, doc: DocumentId, now: Timestamp) -> Option<Timestamp> {
		let req = self.pending.remove(&doc)?;
		self.last_runs.insert(doc, now);
		Some(req.at)
	}

	/// Runs [`Self::due`] and [`Self::dispatch`] for every due document.
	pub fn sweep(&mut self, now: Timestamp) -> Vec<(DocumentId, Timestamp)> {
		self.due(now)
			.into_iter()
			.filter_map(|doc| self.dispatch(doc, now).map(|at| (doc, at)))
			.collect()
	}

	pub fn pending_len(&self) -> usize {
		self.pending.len()
	}

	pub fn pending_at(&self, doc: DocumentId) -> Option<Timestamp> {
		self.pending.get(&doc).map(|req| req.at)
	}

	pub fn last_run(&self, doc: DocumentId) -> Option<Timestamp> {
		self.last_runs.get(&doc).copied()
	}
}
