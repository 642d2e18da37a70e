use std::fmt;
use std::ops::Add;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic clock reading, measured from the owning clock's origin.
///
/// Timestamps from different clocks are not comparable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Duration);

impl Timestamp {
	pub const ZERO: Self = Self(Duration::ZERO);

	pub const fn from_duration(elapsed: Duration) -> Self {
		Self(elapsed)
	}

	pub const fn from_millis(millis: u64) -> Self {
		Self(Duration::from_millis(millis))
	}

	/// Returns the elapsed time since the clock origin.
	pub const fn as_duration(self) -> Duration {
		self.0
	}

	/// Returns the time elapsed from `earlier` to `self`, or zero if `earlier` is later.
	pub fn saturating_since(self, earlier: Timestamp) -> Duration {
		self.0.saturating_sub(earlier.0)
	}
}

impl Add<Duration> for Timestamp {
	type Output = Timestamp;

	fn add(self, rhs: Duration) -> Self::Output {
		Self(self.0 + rhs)
	}
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:.3}s", self.0.as_secs_f64())
	}
}

/// Monotonic time source used for staleness comparisons.
pub trait Clock: Send + Sync + 'static {
	fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by [`Instant`], with its origin at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
	origin: Instant,
}

impl MonotonicClock {
	pub fn new() -> Self {
		Self { origin: Instant::now() }
	}
}

impl Default for MonotonicClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for MonotonicClock {
	fn now(&self) -> Timestamp {
		Timestamp(self.origin.elapsed())
	}
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
	nanos: Arc<AtomicU64>,
}

impl ManualClock {
	/// Creates a clock reading [`Timestamp::ZERO`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Moves the clock forward by `by`.
	pub fn advance(&self, by: Duration) {
		self.nanos.fetch_add(saturating_nanos(by), Ordering::AcqRel);
	}

	/// Sets the clock to an absolute reading.
	pub fn set(&self, at: Timestamp) {
		self.nanos.store(saturating_nanos(at.as_duration()), Ordering::Release);
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Timestamp {
		Timestamp(Duration::from_nanos(self.nanos.load(Ordering::Acquire)))
	}
}

fn saturating_nanos(d: Duration) -> u64 {
	u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
