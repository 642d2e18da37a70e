use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::error::Result;
use crate::settings::{Settings, SettingsFile};

type Listener = Box<dyn Fn(&Settings) + Send + Sync>;

/// Handle returned by [`SettingsStore::on_change`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
	next: u64,
	entries: Vec<(ListenerId, Listener)>,
}

/// Shared, swappable view of the current [`Settings`].
///
/// Readers never block; replacing the settings notifies every listener in
/// registration order.
pub struct SettingsStore {
	current: ArcSwap<Settings>,
	listeners: Mutex<Listeners>,
}

impl fmt::Debug for SettingsStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SettingsStore")
			.field("current", &self.current.load_full())
			.field("listeners", &self.listeners.lock().entries.len())
			.finish()
	}
}

impl Default for SettingsStore {
	fn default() -> Self {
		Self::new(Settings::default())
	}
}

impl SettingsStore {
	pub fn new(settings: Settings) -> Self {
		Self {
			current: ArcSwap::from_pointee(settings),
			listeners: Mutex::new(Listeners::default()),
		}
	}

	/// Reads and resolves a settings document.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		Ok(Self::new(SettingsFile::load(path)?.resolve()?))
	}

	pub fn current(&self) -> Arc<Settings> {
		self.current.load_full()
	}

	/// Swaps in new settings and notifies listeners.
	pub fn replace(&self, settings: Settings) {
		let settings = Arc::new(settings);
		self.current.store(Arc::clone(&settings));
		tracing::debug!(debug = settings.debug, lint_mode = ?settings.lint_mode, "settings.replaced");
		for (_, listener) in self.listeners.lock().entries.iter() {
			listener(&settings);
		}
	}

	/// Re-reads `path`. On error the current settings are kept.
	pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<()> {
		let settings = SettingsFile::load(path)?.resolve()?;
		self.replace(settings);
		Ok(())
	}

	/// Registers `listener` and immediately calls it with the current settings.
	pub fn on_change(&self, listener: impl Fn(&Settings) + Send + Sync + 'static) -> ListenerId {
		listener(&self.current.load());
		let mut listeners = self.listeners.lock();
		let id = ListenerId(listeners.next);
		listeners.next += 1;
		listeners.entries.push((id, Box::new(listener)));
		id
	}

	/// Unregisters a listener. Returns false if it was already gone.
	pub fn remove_listener(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.lock();
		let before = listeners.entries.len();
		listeners.entries.retain(|(entry, _)| *entry != id);
		listeners.entries.len() != before
	}
}
