use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic;
use std::sync::Once;
use std::thread::JoinHandle;

thread_local! {
	static CAPTURE_TRACES: Cell<bool> = const { Cell::new(false) };
	static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static TRACE_HOOK: Once = Once::new();

/// Spawns the dedicated daemon OS thread.
pub(crate) fn spawn_named_thread<F>(name: &str, f: F) -> std::io::Result<JoinHandle<()>>
where
	F: FnOnce() + Send + 'static,
{
	tracing::trace!(thread = name, "daemon.spawn_thread");
	std::thread::Builder::new().name(name.to_string()).spawn(f)
}

/// Extracts the message from a panic payload, if it carries one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		return Some((*msg).to_string());
	}
	payload.downcast_ref::<String>().cloned()
}

/// Records a backtrace for every later panic on the calling thread.
///
/// Installs a process-wide hook once; it chains to the previous hook and
/// only captures on threads that opted in.
pub(crate) fn capture_panic_traces() {
	TRACE_HOOK.call_once(|| {
		let previous = panic::take_hook();
		panic::set_hook(Box::new(move |info| {
			if CAPTURE_TRACES.with(Cell::get) {
				let trace = Backtrace::force_capture().to_string();
				LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
			}
			previous(info);
		}));
	});
	CAPTURE_TRACES.with(|capture| capture.set(true));
}

/// Takes the backtrace of the most recent panic on this thread.
pub(crate) fn take_panic_trace() -> Option<String> {
	LAST_TRACE.with(|slot| slot.borrow_mut().take())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn payload_of(f: impl FnOnce() + panic::UnwindSafe) -> Box<dyn Any + Send> {
		panic::catch_unwind(f).expect_err("closure should panic")
	}

	#[test]
	fn extracts_static_str_payload() {
		let err = payload_of(|| panic!("boom-str"));
		let msg = panic_message(&*err).expect("should carry a message");
		assert!(msg.contains("boom-str"), "expected 'boom-str', got: {msg}");
	}

	#[test]
	fn extracts_string_payload() {
		let err = payload_of(|| panic!("{}", String::from("boom-string")));
		let msg = panic_message(&*err).expect("should carry a message");
		assert!(msg.contains("boom-string"), "expected 'boom-string', got: {msg}");
	}

	#[test]
	fn returns_none_for_opaque_payload() {
		let err = payload_of(|| panic::panic_any(42u32));
		assert!(panic_message(&*err).is_none());
	}

	#[test]
	fn named_thread_carries_name() {
		let handle = spawn_named_thread("lintel-test", || {
			assert_eq!(std::thread::current().name(), Some("lintel-test"));
		})
		.unwrap();
		handle.join().unwrap();
	}

	#[test]
	fn panic_trace_is_captured_only_on_opted_in_threads() {
		let plain = std::thread::spawn(|| {
			let _ = payload_of(|| panic!("not traced"));
			take_panic_trace()
		});
		assert_eq!(plain.join().unwrap(), None);

		capture_panic_traces();
		let _ = payload_of(|| panic!("traced"));
		let trace = take_panic_trace().expect("trace recorded by the hook");
		assert!(trace.lines().count() > 1, "expected a multi-line backtrace, got: {trace}");
		assert_eq!(take_panic_trace(), None);
	}
}
