//! Adds the mark styles to a `.tmTheme` color scheme.
//!
//! A scheme is a plist: `plist > dict > array > dict*`, one dict per style.
//! We append our style dicts to the first such array unless one of its style
//! dicts already has a `<string>` naming [`WARNING_SCOPE`]. The document is
//! parsed with `quick-xml` to locate that array; everything outside the
//! insertion point is copied through byte for byte.

use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{ConfigError, Result};

pub const WARNING_SCOPE: &str = "lintel.mark.warning";

pub const PREAMBLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
"#;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// (name, scope, foreground)
const MARK_STYLES: [(&str, &str, &str); 3] = [
	("lintel Warning", WARNING_SCOPE, "#EDBA00"),
	("lintel Error", "lintel.mark.error", "#DA2000"),
	("lintel Gutter Mark", "lintel.gutter-mark", "#FFFFFF"),
];

/// Where the style array sits in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleArray {
	/// Byte offset of its `</array>`.
	Open { close: usize },
	/// Byte range of an `<array/>` element.
	SelfClosing { start: usize, end: usize },
}

#[derive(Debug, Default)]
struct SchemeScan {
	array: Option<StyleArray>,
	styled: bool,
	decl: bool,
	doctype: bool,
}

impl SchemeScan {
	fn preamble(&self) -> &'static str {
		match (self.decl, self.doctype) {
			(true, _) => "",
			(false, true) => XML_DECL,
			(false, false) => PREAMBLE,
		}
	}
}

/// Returns true if a style dict in the scheme already targets [`WARNING_SCOPE`].
pub fn has_mark_styles(scheme: &str) -> Result<bool> {
	Ok(scan(scheme)?.styled)
}

/// Returns the amended scheme, or `None` when it already has the mark styles.
pub fn patch_color_scheme(scheme: &str) -> Result<Option<String>> {
	let scan = scan(scheme)?;
	if scan.styled {
		return Ok(None);
	}
	let array = scan.array.ok_or(ConfigError::MissingStyleArray)?;
	let styles: String = MARK_STYLES.iter().map(|(name, scope, foreground)| style_dict(name, scope, foreground)).collect();

	let mut out = String::with_capacity(scheme.len() + PREAMBLE.len() + styles.len() + 16);
	out.push_str(scan.preamble());
	match array {
		StyleArray::Open { close } => {
			// Insert on the closing tag's own line when it has nothing else before it.
			let line_start = scheme[..close].rfind('\n').map_or(close, |nl| nl + 1);
			let at = if scheme[line_start..close].trim().is_empty() { line_start } else { close };
			out.push_str(&scheme[..at]);
			out.push_str(&styles);
			out.push_str(&scheme[at..]);
		}
		StyleArray::SelfClosing { start, end } => {
			out.push_str(&scheme[..start]);
			out.push_str("<array>\n");
			out.push_str(&styles);
			out.push_str("\t</array>");
			out.push_str(&scheme[end..]);
		}
	}
	Ok(Some(out))
}

/// File name of the amended copy of `scheme_path`.
pub fn amended_scheme_name(scheme_path: &Path) -> String {
	let stem = scheme_path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
	format!("{stem} - lintel.tmTheme")
}

/// Patches `scheme` and writes it to `<packages>/User/`.
///
/// Returns the new `color_scheme` preference value (`Packages/User/<name>`),
/// or `None` if the scheme needed no changes.
pub fn write_amended_scheme(packages: &Path, scheme_path: &Path, scheme: &str) -> Result<Option<PathBuf>> {
	let Some(amended) = patch_color_scheme(scheme)? else {
		return Ok(None);
	};
	let name = amended_scheme_name(scheme_path);
	let target = packages.join("User").join(&name);
	if let Some(parent) = target.parent() {
		std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
	}
	std::fs::write(&target, amended).map_err(|e| ConfigError::io(&target, e))?;
	tracing::info!(path = %target.display(), "color_scheme.amended");
	Ok(Some(Path::new("Packages").join("User").join(name)))
}

/// Walks the document once, locating the style array (`<root> > dict > array`)
/// and any `<string>` child of its style dicts naming [`WARNING_SCOPE`].
fn scan(scheme: &str) -> Result<SchemeScan> {
	let mut reader = Reader::from_str(scheme);
	let mut path: Vec<Vec<u8>> = Vec::new();
	let mut scan = SchemeScan::default();
	let mut in_array = false;

	loop {
		let before = reader.buffer_position() as usize;
		match reader.read_event()? {
			Event::Decl(_) => scan.decl = true,
			Event::DocType(_) => scan.doctype = true,
			Event::Start(start) => {
				path.push(start.name().as_ref().to_vec());
				if scan.array.is_none() && !in_array && is_style_array(&path) {
					in_array = true;
				}
			}
			Event::Empty(empty) => {
				if scan.array.is_none() && !in_array && empty.name().as_ref() == b"array" && is_style_dict_root(&path) {
					let end = reader.buffer_position() as usize;
					scan.array = Some(StyleArray::SelfClosing { start: before, end });
				}
			}
			Event::End(_) => {
				if in_array && is_style_array(&path) {
					in_array = false;
					scan.array = Some(StyleArray::Open { close: before });
				}
				path.pop();
			}
			Event::Text(text) => {
				if in_array && is_scope_string(&path) && &*text == WARNING_SCOPE.as_bytes() {
					scan.styled = true;
				}
			}
			Event::Eof => break,
			_ => {}
		}
	}
	Ok(scan)
}

/// `<root> > dict`
fn is_style_dict_root(path: &[Vec<u8>]) -> bool {
	path.len() == 2 && path[1] == b"dict"
}

/// `<root> > dict > array`
fn is_style_array(path: &[Vec<u8>]) -> bool {
	path.len() == 3 && is_style_dict_root(&path[..2]) && path[2] == b"array"
}

/// `<root> > dict > array > dict > string`
fn is_scope_string(path: &[Vec<u8>]) -> bool {
	path.len() == 5 && is_style_array(&path[..3]) && path[3] == b"dict" && path[4] == b"string"
}

fn style_dict(name: &str, scope: &str, foreground: &str) -> String {
	format!(
		"\t\t<dict>\n\t\t\t<key>name</key>\n\t\t\t<string>{name}</string>\n\t\t\t<key>scope</key>\n\t\t\t<string>{scope}</string>\n\t\t\t<key>settings</key>\n\t\t\t<dict>\n\t\t\t\t<key>foreground</key>\n\t\t\t\t<string>{foreground}</string>\n\t\t\t</dict>\n\t\t</dict>\n"
	)
}
