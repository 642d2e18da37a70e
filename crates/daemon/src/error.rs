use thiserror::Error;

use crate::queue::QueueError;

/// Errors surfaced by the daemon's control API.
#[derive(Debug, Error)]
pub enum DaemonError {
	/// The OS refused to create the consumer thread.
	#[error("failed to spawn daemon thread: {0}")]
	Spawn(#[from] std::io::Error),

	/// `start` was called after `shutdown`.
	#[error("daemon has been shut down")]
	ShutDown,

	#[error(transparent)]
	Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
