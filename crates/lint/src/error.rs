use lintel_config::ConfigError;
use lintel_daemon::DaemonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LintError {
	#[error(transparent)]
	Daemon(#[from] DaemonError),
	#[error(transparent)]
	Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, LintError>;
