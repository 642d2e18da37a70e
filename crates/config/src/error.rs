//! Error types for settings and scheme handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading settings or patching a color scheme.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading or writing a file.
	#[error("I/O error on {path}: {error}")]
	Io {
		/// Path of the file involved.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Settings document is not valid JSON or has the wrong shape.
	#[error("invalid settings: {0}")]
	Json(#[from] serde_json::Error),

	/// Color scheme is not well-formed XML.
	#[error("invalid color scheme: {0}")]
	Xml(#[from] quick_xml::Error),

	/// Color scheme has no top-level style array to extend.
	#[error("color scheme has no settings array")]
	MissingStyleArray,
}

impl ConfigError {
	pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
		Self::Io { path: path.into(), error }
	}
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
