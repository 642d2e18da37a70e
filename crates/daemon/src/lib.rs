//! Debounced lint dispatch for open documents.
//!
//! Producers call [`Daemon::hit`] whenever a document changes. A single
//! consumer thread coalesces bursts of hits per [`DocumentId`] and invokes the
//! dispatch callback once a document has been quiet for [`MIN_DELAY`]:
//!
//! * only the newest pending request per document is dispatched
//! * requests older than the document's last dispatch are dropped on receipt
//! * [`Daemon::delay`] pauses the consumer, pushing every pending dispatch back
//! * a panic in one loop iteration is logged and the loop keeps running
//!
//! Callbacks run serially on the daemon thread.

mod clock;
mod daemon;
mod error;
mod log;
mod message;
pub mod queue;
mod spawn;
mod state;

pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use daemon::{Daemon, DaemonConfig, DaemonEvent, DaemonEventReceiver, MIN_DELAY};
pub use error::{DaemonError, Result};
pub use log::{DebugFlag, LogSink, Logger, MemorySink, TracingSink};
pub use message::{ControlSignal, DocumentId, QueueMessage};
pub use queue::QueueError;
pub use state::{Admission, DebounceState};
