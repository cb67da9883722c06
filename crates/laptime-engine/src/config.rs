use syn::{parse_quote, Path};

use crate::marker::Marker;
use crate::probe::DEFAULT_PROBE_PREFIX;

/// Default suffix appended to an enclosing type's name for its companion artifact.
pub const DEFAULT_COMPANION_SUFFIX: &str = "Autogenerate";

/// Engine-wide settings shared by every round.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Which attribute marks a callable for instrumentation.
    pub marker: Marker,
    /// Suffix of companion artifact names (`Foo` becomes `FooAutogenerate`).
    pub companion_suffix: String,
    /// Prefix of probe variable names.
    pub probe_prefix: String,
    /// First number tried for probe names.
    pub probe_start: u64,
    /// Path of the runtime crate the generated code calls into.
    pub runtime: Path,
    /// Type implementing `laptime::Clock` that generated code reads.
    pub clock: Path,
    /// Remove consumed marker attributes from instrumented callables.
    pub strip_markers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            marker: Marker::default(),
            companion_suffix: DEFAULT_COMPANION_SUFFIX.to_string(),
            probe_prefix: DEFAULT_PROBE_PREFIX.to_string(),
            probe_start: 0,
            runtime: parse_quote!(::laptime),
            clock: parse_quote!(::laptime::SystemClock),
            strip_markers: false,
        }
    }
}

impl EngineConfig {
    pub fn with_runtime(mut self, runtime: Path) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_clock(mut self, clock: Path) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_companion_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.companion_suffix = suffix.into();
        self
    }

    pub fn with_probe_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.probe_prefix = prefix.into();
        self
    }

    pub fn with_probe_start(mut self, start: u64) -> Self {
        self.probe_start = start;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }

    pub fn strip_markers(mut self, strip: bool) -> Self {
        self.strip_markers = strip;
        self
    }
}
