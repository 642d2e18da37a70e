//! Configuration for lintel.
//!
//! - **Settings**: a JSON document with `default` and `user` sections, merged
//!   into [`Settings`] and shared through a [`SettingsStore`]
//! - **Gutter marks**: icon lookup for the configured gutter theme
//! - **Color scheme**: adds the mark styles to the active `.tmTheme`
//!
//! # Settings document
//!
//! ```json
//! {
//!     "default": {
//!         "debug": false,
//!         "lint_mode": "background",
//!         "gutter_theme": "Default",
//!         "linters": { "flake8": { "max-line-length": 79 } }
//!     },
//!     "user": {
//!         "linters": { "flake8": { "max-line-length": 120 } }
//!     }
//! }
//! ```
//!
//! User values replace defaults key by key; the `linters` table is merged
//! per linter so a user override of one option keeps the others.

pub mod color_scheme;
pub mod error;
pub mod gutter;
pub mod settings;
mod store;

pub use error::{ConfigError, Result};
pub use gutter::{GutterMarks, GutterNotice, GutterResolution, resolve_gutter_marks};
pub use settings::{LintMode, LinterSettings, Settings, SettingsFile, merge_user_settings};
pub use store::{ListenerId, SettingsStore};
