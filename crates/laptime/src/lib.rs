//! # laptime
//!
//! Attribute macros that make a function report how long each call took.
//!
//! Mark a function with `#[time]` and every call prints one line such as
//! `Elapsed 12` to standard output, however the call ends: normally, through
//! an early `return` or `?`, or by panicking. The panic still propagates.
//!
//! - [`macro@time`] on a single function instruments just that function.
//! - [`macro@instrument`] on an `impl`, `trait` or inline `mod` instruments
//!   every `#[time]` function inside and generates a `<Type>Autogenerate`
//!   companion struct for each type that owns one.
//!
//! ```rust,ignore
//! use laptime::time;
//!
//! struct Report;
//!
//! #[laptime::instrument]
//! impl Report {
//!     #[time(clock = nanosecond, format = "render took %s ns")]
//!     fn render(&self) -> String {
//!         "ok".to_string()
//!     }
//! }
//! ```
//!
//! Generated code reads a [`Clock`]; [`SystemClock`] is the default and
//! [`ScriptedClock`] replays fixed readings for tests. Printed lines can be
//! collected with [`report::capture`].

// Re-export the attribute macros
pub use laptime_macros::instrument;
pub use laptime_macros::time;

mod clock;
mod finally;
pub mod report;

pub use clock::{Clock, ClockKind, ScriptedClock, SystemClock};

// Re-export what generated code needs.
#[doc(hidden)]
pub mod __private {
    pub use crate::finally::Finally;
    pub use crate::report::emit as report;
}
