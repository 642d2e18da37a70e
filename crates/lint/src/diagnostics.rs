use std::collections::BTreeMap;

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkKind {
	Warning,
	Error,
}

impl MarkKind {
	/// Color-scheme scope used when drawing marks of this kind.
	pub const fn scope(self) -> &'static str {
		match self {
			Self::Warning => "lintel.mark.warning",
			Self::Error => "lintel.mark.error",
		}
	}
}

/// One finding on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub col: usize,
	pub message: String,
	pub kind: MarkKind,
}

impl Diagnostic {
	pub fn error(col: usize, message: impl Into<String>) -> Self {
		Self {
			col,
			message: message.into(),
			kind: MarkKind::Error,
		}
	}

	pub fn warning(col: usize, message: impl Into<String>) -> Self {
		Self {
			col,
			message: message.into(),
			kind: MarkKind::Warning,
		}
	}
}

/// Findings keyed by zero-based line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
	lines: BTreeMap<usize, Vec<Diagnostic>>,
}

impl ErrorMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, line: usize, diagnostic: Diagnostic) {
		self.lines.entry(line).or_default().push(diagnostic);
	}

	/// Appends every finding of `other`, e.g. when several linters ran on one document.
	pub fn extend(&mut self, other: ErrorMap) {
		for (line, diags) in other.lines {
			self.lines.entry(line).or_default().extend(diags);
		}
	}

	pub fn line(&self, line: usize) -> Option<&[Diagnostic]> {
		self.lines.get(&line).map(Vec::as_slice)
	}

	/// Iterates lines in ascending order.
	pub fn iter(&self) -> impl Iterator<Item = (usize, &[Diagnostic])> {
		self.lines.iter().map(|(line, diags)| (*line, diags.as_slice()))
	}

	pub fn total(&self) -> usize {
		self.lines.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.values().all(Vec::is_empty)
	}
}

/// A point in a document: zero-based line and byte column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
	pub line: usize,
	pub col: usize,
}

impl Position {
	pub const fn new(line: usize, col: usize) -> Self {
		Self { line, col }
	}
}

/// A highlighted byte range within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark {
	pub line: usize,
	pub start: usize,
	pub end: usize,
	pub kind: MarkKind,
}

impl Mark {
	pub const fn begin(&self) -> Position {
		Position::new(self.line, self.start)
	}

	pub const fn end(&self) -> Position {
		Position::new(self.line, self.end)
	}

	/// Inclusive at both ends.
	pub fn contains(&self, point: Position) -> bool {
		self.begin() <= point && point <= self.end()
	}
}

/// Marks to draw for a document plus the gutter line each one implies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSet {
	marks: Vec<Mark>,
	gutter: BTreeMap<usize, MarkKind>,
}

impl HighlightSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a mark. An error on a line outranks a warning in the gutter.
	pub fn add(&mut self, mark: Mark) {
		let slot = self.gutter.entry(mark.line).or_insert(mark.kind);
		*slot = (*slot).max(mark.kind);
		self.marks.push(mark);
	}

	pub fn extend(&mut self, other: HighlightSet) {
		for mark in other.marks {
			self.add(mark);
		}
	}

	pub fn marks(&self, kind: MarkKind) -> impl Iterator<Item = &Mark> {
		self.marks.iter().filter(move |m| m.kind == kind)
	}

	/// Lines carrying a gutter icon and the icon kind, ascending.
	pub fn gutter_lines(&self) -> impl Iterator<Item = (usize, MarkKind)> + '_ {
		self.gutter.iter().map(|(line, kind)| (*line, *kind))
	}

	pub fn is_empty(&self) -> bool {
		self.marks.is_empty()
	}

	/// First mark beginning after `point`.
	///
	/// With `wrap` set and nothing ahead, moves to the first mark, unless the
	/// only mark already contains `point`.
	pub fn next_mark(&self, point: Position, wrap: bool) -> Option<&Mark> {
		let marks = self.sorted();
		let ahead = marks.iter().copied().find(|m| point < m.begin());
		ahead.or_else(|| wrap_to(&marks, point, wrap, marks.first().copied()))
	}

	/// Last mark ending before `point`, wrapping to the last mark like [`Self::next_mark`].
	pub fn previous_mark(&self, point: Position, wrap: bool) -> Option<&Mark> {
		let marks = self.sorted();
		let behind = marks.iter().rev().copied().find(|m| point > m.end());
		behind.or_else(|| wrap_to(&marks, point, wrap, marks.last().copied()))
	}

	fn sorted(&self) -> Vec<&Mark> {
		let mut marks: Vec<&Mark> = self.marks.iter().collect();
		marks.sort_by_key(|m| (m.begin(), m.end()));
		marks
	}
}

fn wrap_to<'a>(marks: &[&'a Mark], point: Position, wrap: bool, target: Option<&'a Mark>) -> Option<&'a Mark> {
	let stuck = marks.len() == 1 && marks[0].contains(point);
	if wrap && !stuck { target } else { None }
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn error_map_counts_and_merges() {
		let mut a = ErrorMap::new();
		a.push(3, Diagnostic::error(4, "undefined name 'x'"));
		let mut b = ErrorMap::new();
		b.push(3, Diagnostic::warning(0, "line too long"));
		b.push(1, Diagnostic::error(0, "syntax error"));

		a.extend(b);
		assert_eq!(a.total(), 3);
		assert_eq!(a.line(3).map(<[Diagnostic]>::len), Some(2));
		assert_eq!(a.iter().map(|(line, _)| line).collect::<Vec<_>>(), vec![1, 3]);
	}

	#[test]
	fn gutter_prefers_errors() {
		let mut set = HighlightSet::new();
		set.add(Mark {
			line: 2,
			start: 0,
			end: 3,
			kind: MarkKind::Error,
		});
		set.add(Mark {
			line: 2,
			start: 5,
			end: 6,
			kind: MarkKind::Warning,
		});
		set.add(Mark {
			line: 7,
			start: 1,
			end: 2,
			kind: MarkKind::Warning,
		});

		assert_eq!(set.gutter_lines().collect::<Vec<_>>(), vec![(2, MarkKind::Error), (7, MarkKind::Warning)]);
		assert_eq!(set.marks(MarkKind::Warning).count(), 2);
	}

	fn mark(line: usize, start: usize, end: usize, kind: MarkKind) -> Mark {
		Mark { line, start, end, kind }
	}

	fn navigable() -> HighlightSet {
		let mut set = HighlightSet::new();
		set.add(mark(8, 4, 9, MarkKind::Error));
		set.add(mark(2, 0, 3, MarkKind::Warning));
		set.add(mark(5, 6, 7, MarkKind::Warning));
		set
	}

	#[test]
	fn next_mark_moves_forward_then_wraps() {
		let set = navigable();
		assert_eq!(set.next_mark(Position::new(0, 0), true), Some(&mark(2, 0, 3, MarkKind::Warning)));
		assert_eq!(set.next_mark(Position::new(2, 0), true), Some(&mark(5, 6, 7, MarkKind::Warning)));
		assert_eq!(set.next_mark(Position::new(8, 4), true), Some(&mark(2, 0, 3, MarkKind::Warning)));
		assert_eq!(set.next_mark(Position::new(8, 4), false), None);
	}

	#[test]
	fn previous_mark_moves_backward_then_wraps() {
		let set = navigable();
		assert_eq!(set.previous_mark(Position::new(9, 0), true), Some(&mark(8, 4, 9, MarkKind::Error)));
		assert_eq!(set.previous_mark(Position::new(8, 5), true), Some(&mark(5, 6, 7, MarkKind::Warning)));
		assert_eq!(set.previous_mark(Position::new(2, 3), true), Some(&mark(8, 4, 9, MarkKind::Error)));
		assert_eq!(set.previous_mark(Position::new(2, 3), false), None);
	}

	#[test]
	fn single_mark_under_cursor_does_not_wrap() {
		let mut set = HighlightSet::new();
		set.add(mark(3, 2, 6, MarkKind::Error));

		assert_eq!(set.next_mark(Position::new(3, 4), true), None);
		assert_eq!(set.previous_mark(Position::new(3, 2), true), None);
		assert_eq!(set.next_mark(Position::new(7, 0), true), Some(&mark(3, 2, 6, MarkKind::Error)));
		assert_eq!(HighlightSet::new().next_mark(Position::default(), true), None);
	}

	#[test]
	fn scopes_match_color_scheme() {
		assert_eq!(MarkKind::Warning.scope(), lintel_config::color_scheme::WARNING_SCOPE);
		assert_eq!(MarkKind::Error.scope(), "lintel.mark.error");
	}
}
