use crate::diagnostics::ErrorMap;

/// Status bar text for a document with `errors`, cursor on `line`.
///
/// Returns `None` when there is nothing to report and the status should be
/// erased.
pub fn status_text(errors: &ErrorMap, line: Option<usize>) -> Option<String> {
	let count = errors.total();
	if count == 0 {
		return None;
	}
	let plural = count > 1;

	let Some((line, diags)) = line.and_then(|l| errors.line(l).filter(|d| !d.is_empty()).map(|d| (l, d))) else {
		return Some(format!("{count} error{}", if plural { "s" } else { "" }));
	};

	let mut sorted: Vec<_> = diags.iter().collect();
	sorted.sort_by_key(|d| d.col);
	let messages: Vec<&str> = sorted.iter().map(|d| d.message.as_str()).collect();

	let prefix = if plural {
		let before: usize = errors.iter().take_while(|(l, _)| *l < line).map(|(_, d)| d.len()).sum();
		let first = before + 1;
		if messages.len() > 1 {
			format!("{first}-{} of {count} errors: ", first + messages.len() - 1)
		} else {
			format!("{first} of {count} errors: ")
		}
	} else {
		"Error: ".to_string()
	};

	Some(prefix + &messages.join("; "))
}
