//! Probe numbering shared by every expansion in one compilation.
//!
//! Each macro invocation runs its own engine. Seeding those engines from one
//! process-wide counter keeps probe names distinct across the whole crate
//! being compiled, not just within one item.

use std::sync::atomic::{AtomicU64, Ordering};

use laptime_engine::{Engine, EngineConfig};

static NEXT_PROBE: AtomicU64 = AtomicU64::new(0);

/// An engine whose probe numbers start after those of earlier expansions.
///
/// `reserve` numbers are claimed up front, one per callable the expansion may
/// instrument.
pub fn engine(config: EngineConfig, reserve: usize) -> Engine {
    let start = NEXT_PROBE.fetch_add(reserve as u64, Ordering::Relaxed);
    Engine::new(config.with_probe_start(start))
}

/// Records the numbers `engine` went through, including any it skipped
/// because the name already occurred in a body.
pub fn finish(engine: &Engine) {
    NEXT_PROBE.fetch_max(engine.next_probe(), Ordering::Relaxed);
}
