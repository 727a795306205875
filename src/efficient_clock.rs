//! Cached wall-clock timestamps for the logging hot path.
//!
//! Formatting a calendar date is far more expensive than enqueueing a log
//! record, so the textual timestamp is prepared ahead of time:
//!
//! * A once-per-second [`Refresher`] updates the calendar state (`now`,
//!   `date`, `date_yesterday`, `prefix`) under a read/write lock.
//! * [`TimestampCache::format`] is the lock-free fast path. It keeps its own
//!   copy of the rendered second (`[YYYY/MM/DD hh:mm:ss`) keyed by the epoch
//!   second, and appends a precomputed millisecond suffix (`.mmm]`) by table
//!   lookup.
//!
//! The two domains are independent. The fast path caches a derived,
//! idempotent value: every caller that observes epoch second `s` renders the
//! exact same bytes for `s`, so when several callers race to install the
//! prefix for a new second, whichever one wins stores the same value the
//! losers would have stored. A reader landing between the winning CAS and the
//! prefix store sees the previous second's prefix, i.e. at most one extra
//! second of staleness, never a timestamp that did not exist.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, FixedOffset, Local};
use crossbeam_channel::{select, Sender};
use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};

/// `chrono` pattern of the cached prefix; the closing bracket comes from the
/// millisecond suffix.
pub const PREFIX_FORMAT: &str = "[%Y/%m/%d %H:%M:%S";
/// `chrono` pattern of `date()` and `date_yesterday()`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Number of entries in the millisecond suffix table.
pub const MILLISECOND_SLOTS: usize = 1024;

lazy_static! {
    static ref MILLISECONDS: Vec<Vec<u8>> = (0..MILLISECOND_SLOTS)
        .map(|i| format!(".{:03}]", i).into_bytes())
        .collect();
}

/// Returns the precomputed suffix for slot `index % 1024`.
#[inline]
pub fn millisecond_suffix(index: usize) -> &'static [u8] {
    &MILLISECONDS[index % MILLISECOND_SLOTS]
}

/// The full suffix table, `".000]"` through `".1023]"`.
pub fn millisecond_table() -> &'static [Vec<u8>] {
    &MILLISECONDS
}

/// Source of wall-clock time for a [`TimestampCache`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to. Intended for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<FixedOffset>) {
        *self.now.lock() = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock()
    }
}

/// Second-granularity state, written only by `refresh`.
struct Calendar {
    now: DateTime<FixedOffset>,
    date: String,
    date_yesterday: String,
    prefix: Vec<u8>,
}

/// Pre-formatted timestamps, refreshed in the background.
///
/// Construct it once, share it behind an `Arc`, and call
/// [`spawn_refresher`](TimestampCache::spawn_refresher) to keep the calendar
/// state current.
pub struct TimestampCache {
    clock: Arc<dyn Clock>,
    calendar: RwLock<Calendar>,
    // Fast path: epoch second of `prefix_cache`.
    seconds: AtomicI64,
    prefix_cache: ArcSwap<Vec<u8>>,
}

fn render_prefix(at: &DateTime<FixedOffset>) -> Vec<u8> {
    at.format(PREFIX_FORMAT).to_string().into_bytes()
}

fn render_date(at: &DateTime<FixedOffset>) -> String {
    at.format(DATE_FORMAT).to_string()
}

impl TimestampCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let prefix = render_prefix(&now);
        let calendar = Calendar {
            now,
            date: render_date(&now),
            date_yesterday: render_date(&(now - chrono::Duration::hours(24))),
            prefix: prefix.clone(),
        };

        Self {
            clock,
            calendar: RwLock::new(calendar),
            seconds: AtomicI64::new(now.timestamp()),
            prefix_cache: ArcSwap::from_pointee(prefix),
        }
    }

    /// A cache over local wall-clock time.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Time of the last refresh.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.calendar.read().now
    }

    /// Date of the last refresh, `YYYY-MM-DD`.
    pub fn date(&self) -> String {
        self.calendar.read().date.clone()
    }

    /// The `date()` value that was current before the last day change.
    pub fn date_yesterday(&self) -> String {
        self.calendar.read().date_yesterday.clone()
    }

    /// Prefix rendered at the last refresh.
    pub fn prefix(&self) -> Vec<u8> {
        self.calendar.read().prefix.clone()
    }

    /// Returns `(prefix, millisecond_suffix)` for the current instant.
    ///
    /// Concatenated they read `[YYYY/MM/DD hh:mm:ss.mmm]`.
    pub fn format(&self) -> (Arc<Vec<u8>>, &'static [u8]) {
        let now = self.clock.now();
        let suffix = millisecond_suffix(now.timestamp_subsec_millis() as usize);

        let cached = self.seconds.load(Ordering::Acquire);
        let second = now.timestamp();
        if cached != second {
            let fresh = Arc::new(render_prefix(&now));
            if self
                .seconds
                .compare_exchange(cached, second, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.prefix_cache.store(Arc::clone(&fresh));
            }
            return (fresh, suffix);
        }

        (self.prefix_cache.load_full(), suffix)
    }

    /// Re-reads the clock and updates the calendar state.
    ///
    /// The day change is detected here only: when the rendered date differs
    /// from the cached one, the old date moves to `date_yesterday`.
    pub fn refresh(&self) {
        let now = self.clock.now();
        let prefix = render_prefix(&now);
        let date = render_date(&now);

        let mut calendar = self.calendar.write();
        calendar.now = now;
        calendar.prefix = prefix;
        if date != calendar.date {
            calendar.date_yesterday = std::mem::replace(&mut calendar.date, date);
        }
    }

    /// Starts a background thread calling [`refresh`](Self::refresh) every
    /// `period`. The thread stops when the returned handle is stopped or
    /// dropped.
    pub fn spawn_refresher(self: &Arc<Self>, period: Duration) -> std::io::Result<Refresher> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let cache = Arc::clone(self);

        let handle = thread::Builder::new()
            .name("timestamp-refresher".into())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(period);
                loop {
                    select! {
                        recv(ticker) -> _ => cache.refresh(),
                        recv(stop_rx) -> _ => break,
                    }
                }
                tracing::debug!("timestamp refresher stopped");
            })?;

        tracing::debug!(?period, "timestamp refresher started");
        Ok(Refresher {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

/// Teardown handle for the background refresh thread.
pub struct Refresher {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Refresher {
    /// Stops the refresh thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("timestamp refresher panicked");
            }
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
