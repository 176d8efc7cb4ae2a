//! Process-wide debug-assertion level.
//!
//! The only operational knob this crate exposes: an
//! integer level consulted the first time any container operation runs, and
//! frozen for the remainder of the process. Modeled directly on the
//! `SIP_KEY`/`Once` pattern the rest of this crate uses for the siphash key
//! (see [`crate::hash`]) — a read-only-after-init global, no runtime setter.
//!
//! - `0` disables all invariant checks.
//! - `1` (default) runs the cheap structural checks.
//! - `>=2` additionally runs the aggressive, O(n)-per-op checks used by the
//!   test suite.
//!
//! Consulted from the `HASHTRIE_ASSERT_LEVEL` environment variable. Invalid
//! or absent values fall back to the default of `1`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Once;

static LEVEL: AtomicU8 = AtomicU8::new(1);
static INIT: Once = Once::new();

fn init() {
    INIT.call_once(|| {
        let level = std::env::var("HASHTRIE_ASSERT_LEVEL")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(1);
        LEVEL.store(level, Ordering::Relaxed);
        log::debug!("hashtrie debug-assertion level initialized to {level}");
    });
}

/// Returns the process-wide debug-assertion level, initializing it from
/// `HASHTRIE_ASSERT_LEVEL` on first use.
#[inline]
pub fn level() -> u8 {
    init();
    LEVEL.load(Ordering::Relaxed)
}

/// True when cheap structural invariant checks should run (level >= 1).
#[inline]
pub fn checks_enabled() -> bool {
    level() >= 1
}

/// True when the aggressive, O(n) invariant checks should run (level >= 2).
#[inline]
pub fn aggressive_checks_enabled() -> bool {
    level() >= 2
}
