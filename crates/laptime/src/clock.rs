//! Time sources read by instrumented code.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::OnceLock;
use std::time::Instant;

/// Resolution of a clock reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ClockKind {
    #[default]
    Millisecond,
    Nanosecond,
}

/// A monotonic time source.
///
/// Instrumented code calls `<C as Clock>::read` twice with the same kind and
/// subtracts the readings, so only differences between readings matter.
pub trait Clock {
    fn read(kind: ClockKind) -> u64;
}

/// The process-wide monotonic clock.
///
/// Readings count from the first read in the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn read(kind: ClockKind) -> u64 {
        static ANCHOR: OnceLock<Instant> = OnceLock::new();
        let elapsed = ANCHOR.get_or_init(Instant::now).elapsed();
        let value = match kind {
            ClockKind::Millisecond => elapsed.as_millis(),
            ClockKind::Nanosecond => elapsed.as_nanos(),
        };
        u64::try_from(value).unwrap_or(u64::MAX)
    }
}

thread_local! {
    static SCRIPT: RefCell<Script> = RefCell::new(Script::default());
}

#[derive(Default)]
struct Script {
    readings: VecDeque<u64>,
    last: u64,
}

/// A clock that replays readings scripted on the current thread.
///
/// Once the script runs out, the last reading repeats. Readings ignore the
/// clock kind.
///
/// ```
/// use laptime::{Clock, ClockKind, ScriptedClock};
///
/// ScriptedClock::script([100, 142]);
/// assert_eq!(ScriptedClock::read(ClockKind::Millisecond), 100);
/// assert_eq!(ScriptedClock::read(ClockKind::Millisecond), 142);
/// assert_eq!(ScriptedClock::read(ClockKind::Millisecond), 142);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedClock;

impl ScriptedClock {
    /// Replaces the current thread's script.
    pub fn script(readings: impl IntoIterator<Item = u64>) {
        SCRIPT.with(|script| {
            let mut script = script.borrow_mut();
            script.readings = readings.into_iter().collect();
            script.last = 0;
        });
    }

    /// Readings left in the current thread's script.
    pub fn remaining() -> usize {
        SCRIPT.with(|script| script.borrow().readings.len())
    }
}

impl Clock for ScriptedClock {
    fn read(_kind: ClockKind) -> u64 {
        SCRIPT.with(|script| {
            let mut script = script.borrow_mut();
            if let Some(next) = script.readings.pop_front() {
                script.last = next;
            }
            script.last
        })
    }
}
