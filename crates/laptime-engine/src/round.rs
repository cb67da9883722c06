//! One discovery-and-transform pass.

use syn::Block;
use tracing::{debug, trace, warn};

use crate::companion::CompanionArtifact;
use crate::config::EngineConfig;
use crate::discovery::{discover, Discovery, MarkedCallable};
use crate::error::{EngineError, Result};
use crate::host::{ArtifactEmitter, Diagnostic, Diagnostics, ProgramModel};
use crate::marker::{MarkerConfig, ResolvedMarker};
use crate::probe::ProbeNames;
use crate::transform::{describe, instrument_block, is_instrumented};

/// What happened to a body handed to [`Engine::instrument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Instrumented,
    /// The body already carries a probe and was left as is.
    AlreadyInstrumented,
}

/// Names of what a round touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub instrumented: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub artifacts: Vec<String>,
}

/// The instrumentation engine.
///
/// Holds the configuration and the probe-name counter; everything else is
/// scoped to a single [`Engine::run_round`] call. Use one engine per
/// compilation unit so probe names stay unique across its rounds.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    probes: ProbeNames,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let probes = ProbeNames::starting_at(config.probe_prefix.clone(), config.probe_start);
        Self { config, probes }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The number the next probe name will try first.
    pub fn next_probe(&self) -> u64 {
        self.probes.next_number()
    }

    /// Lists the marked callables of `model`.
    pub fn discover<M>(&self, model: &M) -> Discovery
    where
        M: ProgramModel + ?Sized,
    {
        discover(model, &self.config.marker)
    }

    /// Rewrites `body` in place according to `marker`.
    ///
    /// Fails without touching `body` if the template is invalid.
    pub fn instrument(&mut self, body: &mut Block, marker: &MarkerConfig) -> Result<Outcome> {
        let template = marker.template()?;
        if is_instrumented(body, &self.probes) {
            return Ok(Outcome::AlreadyInstrumented);
        }
        let probe = self.probes.fresh(body);
        *body = instrument_block(body, &probe, marker.clock_kind, &template, &self.config);
        debug!(%probe, clock = %marker.clock_kind, "instrumented body");
        trace!(body = %describe(body), "rewritten body");
        Ok(Outcome::Instrumented)
    }

    /// Discovers marked callables in `model`, rewrites their bodies and emits
    /// one companion artifact per enclosing type of a marked callable.
    ///
    /// Errors are reported to `diagnostics` and never stop the round.
    pub fn run_round<M, D, E>(
        &mut self,
        model: &mut M,
        diagnostics: &mut D,
        emitter: &mut E,
    ) -> RoundSummary
    where
        M: ProgramModel + ?Sized,
        D: Diagnostics + ?Sized,
        E: ArtifactEmitter + ?Sized,
    {
        let discovery = self.discover(&*model);
        let mut summary = RoundSummary::default();
        let Some(resolved) = discovery.resolved.as_ref() else {
            return summary;
        };

        // Every owner of a marked callable gets its companion, even if none of
        // its members could be rewritten this round.
        let owners = discovery.owners();

        for rejected in &discovery.rejected {
            report_error(diagnostics, &rejected.error, rejected.span);
            summary.failed.push(rejected.name.clone());
            if self.config.strip_markers {
                strip_marker(model, rejected.id, resolved);
            }
        }

        for callable in &discovery.marked {
            let name = callable.qualified_name();
            match self.transform(model, callable) {
                Ok(Some(Outcome::Instrumented)) => summary.instrumented.push(name),
                Ok(Some(Outcome::AlreadyInstrumented)) | Ok(None) => {
                    debug!(callable = %name, "left unchanged");
                    summary.skipped.push(name);
                }
                Err(err) => {
                    report_error(diagnostics, &err, callable.span);
                    summary.failed.push(name);
                }
            }
            if self.config.strip_markers {
                strip_marker(model, callable.id, resolved);
            }
        }

        for (owner, origin) in owners {
            let artifact =
                CompanionArtifact::for_owner(&owner, origin, &self.config.companion_suffix);
            let qualified = artifact.qualified_name();
            match emitter.emit(&artifact) {
                Ok(()) => {
                    debug!(artifact = %qualified, "emitted companion artifact");
                    diagnostics.report(Diagnostic::note(format!("created {qualified}")));
                    summary.artifacts.push(qualified);
                }
                Err(source) => {
                    let err = EngineError::Emit {
                        artifact: qualified,
                        source,
                    };
                    report_error(diagnostics, &err, owner.name.span());
                }
            }
        }

        summary
    }

    /// `Ok(None)` when the model has no body for the callable this round.
    fn transform<M>(&mut self, model: &mut M, callable: &MarkedCallable) -> Result<Option<Outcome>>
    where
        M: ProgramModel + ?Sized,
    {
        if callable.is_const {
            return Err(EngineError::ConstFn(callable.qualified_name()));
        }
        let Some(body) = model.body_mut(callable.id) else {
            return Ok(None);
        };
        self.instrument(body, &callable.config).map(Some)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn strip_marker<M>(model: &mut M, id: crate::host::CallableId, marker: &ResolvedMarker)
where
    M: ProgramModel + ?Sized,
{
    if let Some(attrs) = model.attrs_mut(id) {
        attrs.retain(|attr| !marker.matches(attr));
    }
}

fn report_error<D>(diagnostics: &mut D, err: &EngineError, span: proc_macro2::Span)
where
    D: Diagnostics + ?Sized,
{
    warn!(error = %err, "instrumentation failed");
    diagnostics.report(Diagnostic::error(err.to_string()).with_span(span));
}
