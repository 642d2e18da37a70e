//! Plugin settings and the default/user merge.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Per-linter settings table, kept as raw JSON.
pub type LinterSettings = Map<String, Value>;

/// When documents are linted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LintMode {
	/// Lint after every modification.
	#[default]
	#[serde(rename = "background")]
	Background,
	#[serde(rename = "load/save")]
	LoadSave,
	#[serde(rename = "save only")]
	SaveOnly,
	#[serde(rename = "manual")]
	Manual,
}

impl LintMode {
	pub const fn lints_on_modify(self) -> bool {
		matches!(self, Self::Background)
	}

	pub const fn lints_on_activate(self) -> bool {
		matches!(self, Self::Background | Self::LoadSave)
	}

	pub const fn lints_on_save(self) -> bool {
		matches!(self, Self::LoadSave | Self::SaveOnly)
	}
}

/// Effective settings after merging user overrides into the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Gates debug log output.
	pub debug: bool,
	pub lint_mode: LintMode,
	/// Name of the gutter icon theme.
	pub gutter_theme: String,
	pub show_errors_on_save: bool,
	/// Error navigation wraps around the ends of the document.
	pub wrap_find: bool,
	pub linters: BTreeMap<String, LinterSettings>,
	/// Keys this crate does not interpret.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			debug: false,
			lint_mode: LintMode::default(),
			gutter_theme: crate::gutter::DEFAULT_THEME.to_string(),
			show_errors_on_save: false,
			wrap_find: true,
			linters: BTreeMap::new(),
			extra: Map::new(),
		}
	}
}

impl Settings {
	/// Builds settings from an already merged JSON object.
	pub fn from_map(map: Map<String, Value>) -> Result<Self> {
		Ok(serde_json::from_value(Value::Object(map))?)
	}

	pub fn linter(&self, name: &str) -> Option<&LinterSettings> {
		self.linters.get(name)
	}

	/// Adds any key of `defaults` missing from the settings of linter `name`.
	pub fn fill_linter_defaults(&mut self, name: &str, defaults: &LinterSettings) {
		let table = self.linters.entry(name.to_string()).or_default();
		for (key, value) in defaults {
			table.entry(key.clone()).or_insert_with(|| value.clone());
		}
	}
}

/// On-disk settings document: `{ "default": {...}, "user": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
	pub default: Map<String, Value>,
	pub user: Map<String, Value>,
}

impl SettingsFile {
	pub fn parse(text: &str) -> Result<Self> {
		Ok(serde_json::from_str(text)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
		Self::parse(&text)
	}

	/// Merges `user` over `default` and deserializes the result.
	pub fn resolve(&self) -> Result<Settings> {
		Settings::from_map(merge_user_settings(&self.default, &self.user))
	}
}

/// Merges user settings over the defaults.
///
/// Top-level keys in `user` replace those in `default`, except `linters`,
/// which is merged one linter table at a time.
pub fn merge_user_settings(default: &Map<String, Value>, user: &Map<String, Value>) -> Map<String, Value> {
	let mut merged = default.clone();
	if user.is_empty() {
		return merged;
	}

	let mut linters = match merged.remove("linters") {
		Some(Value::Object(linters)) => linters,
		_ => Map::new(),
	};
	if let Some(Value::Object(user_linters)) = user.get("linters") {
		for (name, data) in user_linters {
			match (linters.get_mut(name), data) {
				(Some(Value::Object(existing)), Value::Object(overrides)) => {
					existing.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
				}
				_ => {
					linters.insert(name.clone(), data.clone());
				}
			}
		}
	}

	for (key, value) in user.iter().filter(|(key, _)| key.as_str() != "linters") {
		merged.insert(key.clone(), value.clone());
	}
	merged.insert("linters".to_string(), Value::Object(linters));
	merged
}
