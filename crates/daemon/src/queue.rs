//! Unbounded request queue between producers and the daemon thread.
//!
//! Any number of [`RequestSender`]s may push; exactly one [`RequestReceiver`]
//! pops. The queue never drops messages; supersession is the daemon's job.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::message::QueueMessage;

/// Enqueue error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
	#[error("request queue is closed")]
	Closed,
}

/// Result of a timed dequeue.
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued {
	Message(QueueMessage),
	/// No message arrived within the timeout.
	TimedOut,
	/// The queue was closed and has been drained.
	Closed,
}

struct QueueState {
	queue: VecDeque<QueueMessage>,
	closed: bool,
}

struct QueueInner {
	state: Mutex<QueueState>,
	ready: Condvar,
}

/// Multi-producer handle.
#[derive(Clone)]
pub struct RequestSender {
	inner: Arc<QueueInner>,
}

/// Single-consumer handle. Deliberately not `Clone`.
pub struct RequestReceiver {
	inner: Arc<QueueInner>,
}

/// Creates a connected sender/receiver pair.
pub fn request_queue() -> (RequestSender, RequestReceiver) {
	let inner = Arc::new(QueueInner {
		state: Mutex::new(QueueState {
			queue: VecDeque::new(),
			closed: false,
		}),
		ready: Condvar::new(),
	});
	(RequestSender { inner: Arc::clone(&inner) }, RequestReceiver { inner })
}

impl RequestSender {
	/// Non-blocking enqueue.
	pub fn send(&self, msg: QueueMessage) -> Result<(), QueueError> {
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(QueueError::Closed);
		}
		state.queue.push_back(msg);
		drop(state);
		self.inner.ready.notify_one();
		Ok(())
	}

	/// Closes the queue. The receiver drains what is queued, then sees [`Dequeued::Closed`].
	pub fn close(&self) {
		self.inner.state.lock().closed = true;
		self.inner.ready.notify_all();
	}

	/// Returns current queue depth.
	pub fn len(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl RequestReceiver {
	/// Blocks up to `timeout` for the next message.
	pub fn recv_timeout(&self, timeout: Duration) -> Dequeued {
		let deadline = Instant::now() + timeout;
		let mut state = self.inner.state.lock();
		loop {
			if let Some(msg) = state.queue.pop_front() {
				return Dequeued::Message(msg);
			}
			if state.closed {
				return Dequeued::Closed;
			}
			if self.inner.ready.wait_until(&mut state, deadline).timed_out() {
				// A send may have raced the deadline.
				return match state.queue.pop_front() {
					Some(msg) => Dequeued::Message(msg),
					None if state.closed => Dequeued::Closed,
					None => Dequeued::TimedOut,
				};
			}
		}
	}

	/// Blocks for `duration` without dequeuing anything.
	///
	/// Returns `false` if the queue was closed before the pause elapsed.
	pub fn park(&self, duration: Duration) -> bool {
		let deadline = Instant::now() + duration;
		let mut state = self.inner.state.lock();
		loop {
			if state.closed {
				return false;
			}
			if self.inner.ready.wait_until(&mut state, deadline).timed_out() {
				return !state.closed;
			}
		}
	}

	/// Returns current queue depth.
	pub fn len(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
