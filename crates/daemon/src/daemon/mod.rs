use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, Timestamp};
use crate::error::{DaemonError, Result};
use crate::log::Logger;
use crate::message::{ControlSignal, DocumentId, QueueMessage};
use crate::queue::{Dequeued, QueueError, RequestReceiver, RequestSender, request_queue};
use crate::spawn::{capture_panic_traces, panic_message, spawn_named_thread, take_panic_trace};
use crate::state::{Admission, DebounceState};

/// Quiet period a document must see before its latest request dispatches.
pub const MIN_DELAY: Duration = Duration::from_millis(100);

const DELIMITER: &str = "--------------------";

/// Daemon construction parameters.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
	pub min_delay: Duration,
	pub thread_name: String,
	/// Capacity of the [`DaemonEvent`] broadcast buffer.
	pub event_buffer: usize,
}

impl Default for DaemonConfig {
	fn default() -> Self {
		Self {
			min_delay: MIN_DELAY,
			thread_name: "lintel-daemon".to_string(),
			event_buffer: 64,
		}
	}
}

/// Observable daemon activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
	/// The callback ran for `doc` with the request timestamp `at`.
	Dispatched { doc: DocumentId, at: Timestamp },
	Reloaded,
	Stopped,
}

/// Receiver for [`DaemonEvent`]s.
pub type DaemonEventReceiver = broadcast::Receiver<DaemonEvent>;

struct DispatchCallback {
	f: Box<dyn Fn(DocumentId, Timestamp) + Send + Sync>,
}

enum ThreadSlot {
	Idle(RequestReceiver),
	Running(JoinHandle<()>),
	Stopped,
}

struct Shared {
	config: DaemonConfig,
	clock: Arc<dyn Clock>,
	logger: Logger,
	tx: RequestSender,
	callback: Arc<ArcSwapOption<DispatchCallback>>,
	events: broadcast::Sender<DaemonEvent>,
	cancel: CancellationToken,
	thread: Mutex<ThreadSlot>,
}

impl Drop for Shared {
	fn drop(&mut self) {
		self.cancel.cancel();
		self.tx.close();
	}
}

/// Handle to the debounce daemon.
///
/// Clones share one queue and one consumer thread. The thread stops on
/// [`Daemon::shutdown`] or when the last handle is dropped.
#[derive(Clone)]
pub struct Daemon {
	shared: Arc<Shared>,
}

impl fmt::Debug for Daemon {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Daemon")
			.field("config", &self.shared.config)
			.field("running", &self.is_running())
			.field("queued", &self.shared.tx.len())
			.finish()
	}
}

impl Daemon {
	pub fn new(config: DaemonConfig, clock: Arc<dyn Clock>, logger: Logger) -> Self {
		let (tx, rx) = request_queue();
		let (events, _) = broadcast::channel(config.event_buffer.max(1));
		Self {
			shared: Arc::new(Shared {
				config,
				clock,
				logger,
				tx,
				callback: Arc::new(ArcSwapOption::empty()),
				events,
				cancel: CancellationToken::new(),
				thread: Mutex::new(ThreadSlot::Idle(rx)),
			}),
		}
	}

	/// Installs `callback` and starts the consumer thread.
	///
	/// When the thread is already running only the callback is replaced and a
	/// [`ControlSignal::Reload`] is queued.
	pub fn start<F>(&self, callback: F) -> Result<()>
	where
		F: Fn(DocumentId, Timestamp) + Send + Sync + 'static,
	{
		let mut slot = self.shared.thread.lock();
		if matches!(*slot, ThreadSlot::Stopped) || self.shared.cancel.is_cancelled() {
			return Err(DaemonError::ShutDown);
		}
		self.shared.callback.store(Some(Arc::new(DispatchCallback { f: Box::new(callback) })));

		if matches!(*slot, ThreadSlot::Running(_)) {
			self.shared.tx.send(QueueMessage::Control(ControlSignal::Reload))?;
			return Ok(());
		}

		let ThreadSlot::Idle(rx) = std::mem::replace(&mut *slot, ThreadSlot::Stopped) else {
			unreachable!("slot checked above")
		};
		let worker = Worker {
			min_delay: self.shared.config.min_delay,
			clock: Arc::clone(&self.shared.clock),
			logger: self.shared.logger.clone(),
			callback: Arc::clone(&self.shared.callback),
			events: self.shared.events.clone(),
			cancel: self.shared.cancel.clone(),
		};
		let handle = spawn_named_thread(&self.shared.config.thread_name, move || worker.run(rx))?;
		*slot = ThreadSlot::Running(handle);
		tracing::debug!(min_delay_ms = self.shared.config.min_delay.as_millis() as u64, "daemon.started");
		Ok(())
	}

	/// Queues a check for `doc` stamped with the current time, and returns that time.
	pub fn hit(&self, doc: DocumentId) -> Timestamp {
		let at = self.shared.clock.now();
		if self.shared.tx.send(QueueMessage::check(doc, at)).is_err() {
			tracing::debug!(%doc, %at, "daemon.hit_after_shutdown");
		}
		at
	}

	/// Pauses the consumer for `millis` milliseconds once it reaches this message.
	pub fn delay(&self, millis: u64) {
		if self.shared.tx.send(QueueMessage::delay_millis(millis)).is_err() {
			tracing::debug!(millis, "daemon.delay_after_shutdown");
		}
	}

	/// Queues a raw message.
	pub fn enqueue(&self, msg: QueueMessage) -> std::result::Result<(), QueueError> {
		self.shared.tx.send(msg)
	}

	/// Logs `msg` only when debugging is enabled.
	pub fn debug(&self, msg: impl fmt::Display) {
		self.shared.logger.debug(msg);
	}

	/// Logs `msg` unconditionally.
	pub fn printf(&self, msg: impl fmt::Display) {
		self.shared.logger.printf(msg);
	}

	pub fn logger(&self) -> &Logger {
		&self.shared.logger
	}

	pub fn subscribe(&self) -> DaemonEventReceiver {
		self.shared.events.subscribe()
	}

	/// Returns true while the consumer thread is alive.
	pub fn is_running(&self) -> bool {
		match &*self.shared.thread.lock() {
			ThreadSlot::Running(handle) => !handle.is_finished(),
			ThreadSlot::Idle(_) | ThreadSlot::Stopped => false,
		}
	}

	/// Stops the consumer thread and waits for it to exit. Idempotent.
	///
	/// Requests still pending are not dispatched. When called from the
	/// dispatch callback the thread is signalled but not joined.
	pub fn shutdown(&self) {
		let slot = std::mem::replace(&mut *self.shared.thread.lock(), ThreadSlot::Stopped);
		let _ = self.shared.tx.send(QueueMessage::Control(ControlSignal::Shutdown));
		self.shared.cancel.cancel();
		self.shared.tx.close();

		let ThreadSlot::Running(handle) = slot else {
			return;
		};
		if handle.thread().id() == std::thread::current().id() {
			return;
		}
		if handle.join().is_err() {
			tracing::warn!("daemon thread exited by panic");
		}
	}
}

enum Step {
	Continue,
	Exit,
}

/// State moved onto the consumer thread.
struct Worker {
	min_delay: Duration,
	clock: Arc<dyn Clock>,
	logger: Logger,
	callback: Arc<ArcSwapOption<DispatchCallback>>,
	events: broadcast::Sender<DaemonEvent>,
	cancel: CancellationToken,
}

impl Worker {
	fn run(self, rx: RequestReceiver) {
		let mut state = DebounceState::new(self.min_delay);
		capture_panic_traces();
		while !self.cancel.is_cancelled() {
			match panic::catch_unwind(AssertUnwindSafe(|| self.step(&rx, &mut state))) {
				Ok(Step::Continue) => {}
				Ok(Step::Exit) => break,
				Err(payload) => self.report_panic(payload_text(&*payload), take_panic_trace()),
			}
		}
		tracing::debug!(pending = state.pending_len(), "daemon.exit");
		let _ = self.events.send(DaemonEvent::Stopped);
	}

	fn step(&self, rx: &RequestReceiver, state: &mut DebounceState) -> Step {
		match rx.recv_timeout(self.min_delay) {
			Dequeued::Message(msg) => self.handle(msg, rx, state),
			Dequeued::TimedOut => {
				self.sweep(state);
				Step::Continue
			}
			Dequeued::Closed => Step::Exit,
		}
	}

	fn handle(&self, msg: QueueMessage, rx: &RequestReceiver, state: &mut DebounceState) -> Step {
		match msg {
			QueueMessage::Check { doc, at } => {
				let admission = state.accept(doc, at, self.clock.now());
				match admission {
					Admission::Accepted | Admission::Superseded { .. } => {
						tracing::trace!(%doc, %at, pending = state.pending_len(), "daemon.accept");
					}
					Admission::Outdated { pending } => {
						tracing::trace!(%doc, %at, %pending, "daemon.outdated");
					}
					Admission::Stale { last_run } => {
						tracing::trace!(%doc, %at, %last_run, "daemon.stale");
					}
				}
			}
			QueueMessage::Delay(pause) => {
				tracing::trace!(pause_ms = pause.as_millis() as u64, "daemon.delay");
				if !rx.park(pause) {
					tracing::debug!("daemon.delay_interrupted");
				}
			}
			QueueMessage::Control(ControlSignal::Reload) => {
				self.logger.printf("daemon detected a reload");
				let _ = self.events.send(DaemonEvent::Reloaded);
			}
			QueueMessage::Control(ControlSignal::Shutdown) => return Step::Exit,
			QueueMessage::Control(ControlSignal::Other(tag)) => {
				self.logger.printf(format_args!("unknown message sent to daemon: {tag}"));
			}
		}
		Step::Continue
	}

	/// Dispatches every document whose window has elapsed.
	///
	/// Each document leaves the pending set before its callback runs, so a
	/// panicking callback never causes a second dispatch of the same request.
	fn sweep(&self, state: &mut DebounceState) {
		let now = self.clock.now();
		for doc in state.due(now) {
			let Some(at) = state.dispatch(doc, now) else {
				continue;
			};
			tracing::debug!(%doc, %at, %now, "daemon.dispatch");
			match self.callback.load_full() {
				Some(callback) => (callback.f)(doc, at),
				None => tracing::warn!(%doc, "daemon.dispatch_without_callback"),
			}
			let _ = self.events.send(DaemonEvent::Dispatched { doc, at });
		}
	}

	fn report_panic(&self, detail: String, trace: Option<String>) {
		tracing::error!(detail = %detail, "daemon.iteration_panicked");
		self.logger.printf("error in daemon:");
		self.logger.printf(DELIMITER);
		self.logger.printf(detail);
		if let Some(trace) = trace {
			self.logger.printf(trace.trim_end());
		}
		self.logger.printf(DELIMITER);
	}
}

fn payload_text(payload: &(dyn std::any::Any + Send)) -> String {
	panic_message(payload).unwrap_or_else(|| "panic with non-string payload".to_string())
}
