//! # laptime-engine
//!
//! The engine behind the `laptime` attributes: it finds callables marked with
//! `#[time]`, rewrites their bodies so each call reports how long it took,
//! and emits one companion artifact per type that owns a marked callable.
//!
//! The engine works on parsed `syn` trees and knows nothing about where they
//! came from. A host plugs it in through the traits in [`host`]:
//!
//! - the `laptime-macros` crate runs a round over the item an attribute macro
//!   is applied to and emits companions as generated items;
//! - [`instrument_source`] runs a round over a whole source file, splices the
//!   rewritten bodies into its text and writes companions with a
//!   [`FileEmitter`].
//!
//! ## What a rewritten body looks like
//!
//! ```rust,ignore
//! #[time(clock = nanosecond, format = "took %s ns")]
//! fn compute() -> u32 {
//!     42
//! }
//! ```
//!
//! becomes
//!
//! ```rust,ignore
//! fn compute() -> u32 {
//!     let __laptime_start_0: u64 =
//!         <::laptime::SystemClock as ::laptime::Clock>::read(::laptime::ClockKind::Nanosecond);
//!     {
//!         let __laptime_cleanup = ::laptime::__private::Finally::new(move || {
//!             let elapsed: u64 = <::laptime::SystemClock as ::laptime::Clock>::read(
//!                 ::laptime::ClockKind::Nanosecond,
//!             )
//!             .saturating_sub(__laptime_start_0);
//!             ::laptime::__private::report(::core::format_args!("took {} ns", elapsed));
//!         });
//!         42
//!     }
//! }
//! ```

pub mod companion;
pub mod config;
pub mod discovery;
mod error;
pub mod fs;
pub mod host;
pub mod marker;
pub mod probe;
mod round;
pub mod source;
mod splice;
pub mod template;
pub mod transform;

pub use companion::CompanionArtifact;
pub use config::EngineConfig;
pub use discovery::{Discovery, MarkedCallable};
pub use error::{EngineError, Result};
pub use fs::FileEmitter;
pub use host::{
    ArtifactEmitter, CallableId, CollectedDiagnostics, Diagnostic, Diagnostics, Owner,
    ProgramModel, Severity,
};
pub use marker::{ClockKind, Marker, MarkerConfig};
pub use round::{Engine, Outcome, RoundSummary};
pub use source::{instrument_source, MarkerScope, SourceTree};
pub use template::{MessageTemplate, TemplateError};
