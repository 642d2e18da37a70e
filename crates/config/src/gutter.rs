//! Gutter icon theme lookup.

use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_THEME: &str = "Default";

/// Directory under `User/` holding user-installed gutter themes.
pub const USER_THEMES_DIR: &str = "lintel-gutter-themes";

/// Icon references handed to the editor when drawing gutter marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GutterMarks {
	pub warning: String,
	pub error: String,
	/// Icons should be tinted with the mark colors.
	pub colorize: bool,
}

impl Default for GutterMarks {
	fn default() -> Self {
		Self {
			warning: "dot".to_string(),
			error: "dot".to_string(),
			colorize: true,
		}
	}
}

impl GutterMarks {
	fn disabled() -> Self {
		Self {
			warning: String::new(),
			error: String::new(),
			colorize: false,
		}
	}
}

/// Something the user should hear about after resolving a theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GutterNotice {
	FellBackToDefault { theme: String },
	Unavailable { theme: String },
}

impl fmt::Display for GutterNotice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::FellBackToDefault { theme } => write!(f, "cannot find the gutter theme '{theme}', using the default"),
			Self::Unavailable { theme } => write!(
				f,
				"cannot find the gutter theme \"{theme}\", and the default is also not available. No gutter marks will display."
			),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GutterResolution {
	pub marks: GutterMarks,
	pub notice: Option<GutterNotice>,
}

/// Finds the gutter theme directory and derives the mark icons.
///
/// User themes win over themes bundled in `plugin_dir`; the bundled
/// `Default` theme is the last resort. Icon paths are reported relative to
/// the editor's package root as `Packages/<theme dir>/<kind>.png`.
pub fn resolve_gutter_marks(packages: &Path, plugin_dir: &str, theme: &str) -> GutterResolution {
	let candidates = [
		Path::new("User").join(USER_THEMES_DIR).join(theme),
		Path::new(plugin_dir).join("gutter-themes").join(theme),
		Path::new(plugin_dir).join("gutter-themes").join(DEFAULT_THEME),
	];

	let Some(found) = candidates.iter().position(|sub| packages.join(sub).is_dir()) else {
		tracing::warn!(theme, "gutter.theme_unavailable");
		return GutterResolution {
			marks: GutterMarks::disabled(),
			notice: Some(GutterNotice::Unavailable { theme: theme.to_string() }),
		};
	};
	let theme_path = &candidates[found];

	let icon = |kind: &str| -> String { icon_path(theme_path, kind).to_string_lossy().into_owned() };
	let marks = GutterMarks {
		warning: icon("warning"),
		error: icon("error"),
		colorize: packages.join(theme_path).join("colorize").exists(),
	};
	let notice = (found == candidates.len() - 1 && theme != DEFAULT_THEME).then(|| GutterNotice::FellBackToDefault { theme: theme.to_string() });

	GutterResolution { marks, notice }
}

fn icon_path(theme_path: &Path, kind: &str) -> PathBuf {
	Path::new("Packages").join(theme_path).join(format!("{kind}.png"))
}
