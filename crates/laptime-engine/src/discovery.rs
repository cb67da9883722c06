//! Finding the callables to instrument in a round.

use proc_macro2::{Ident, Span};
use syn::spanned::Spanned;
use tracing::{debug, trace};

use crate::error::EngineError;
use crate::host::{CallableId, Owner, ProgramModel};
use crate::marker::{Marker, MarkerConfig, ResolvedMarker};

/// A callable carrying the marker, paired with its configuration.
#[derive(Debug, Clone)]
pub struct MarkedCallable {
    pub id: CallableId,
    pub name: Ident,
    pub owner: Option<Owner>,
    pub config: MarkerConfig,
    pub is_const: bool,
    /// Span of the marker attribute, for diagnostics.
    pub span: Span,
}

impl MarkedCallable {
    /// `Owner::name` for methods, `name` for free functions.
    pub fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}::{}", owner.name, self.name),
            None => self.name.to_string(),
        }
    }
}

/// A marked callable whose marker could not be read.
#[derive(Debug)]
pub struct Rejected {
    pub id: CallableId,
    pub name: String,
    pub owner: Option<Owner>,
    pub span: Span,
    pub error: EngineError,
}

/// Result of scanning one round.
#[derive(Debug, Default)]
pub struct Discovery {
    /// How the marker resolved; `None` if it is not in scope.
    pub resolved: Option<ResolvedMarker>,
    pub marked: Vec<MarkedCallable>,
    pub rejected: Vec<Rejected>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.marked.is_empty() && self.rejected.is_empty()
    }

    /// Enclosing types of all marked callables, rejected ones included, each
    /// once and in source order, paired with the qualified name of its first
    /// marked member.
    pub fn owners(&self) -> Vec<(Owner, String)> {
        let mut members: Vec<(CallableId, &Owner, String)> = self
            .marked
            .iter()
            .filter_map(|callable| {
                let owner = callable.owner.as_ref()?;
                Some((callable.id, owner, callable.qualified_name()))
            })
            .chain(self.rejected.iter().filter_map(|rejected| {
                let owner = rejected.owner.as_ref()?;
                Some((rejected.id, owner, format!("{}::{}", owner.name, rejected.name)))
            }))
            .collect();
        members.sort_by_key(|(id, _, _)| id.0);

        let mut owners: Vec<(Owner, String)> = Vec::new();
        for (_, owner, origin) in members {
            if !owners.iter().any(|(seen, _)| seen == owner) {
                owners.push((owner.clone(), origin));
            }
        }
        owners
    }
}

/// Lists the marked callables of `model` in source order.
///
/// An unresolvable marker or a round without marked callables yields an empty
/// result. Callables without a body are skipped.
pub fn discover<M>(model: &M, marker: &Marker) -> Discovery
where
    M: ProgramModel + ?Sized,
{
    let Some(resolved) = model.resolve_marker(marker) else {
        debug!(marker = %marker.name, "marker not in scope, nothing to do");
        return Discovery::default();
    };

    let mut discovery = Discovery::default();
    for element in model.annotated(&resolved) {
        if !element.has_body {
            trace!(callable = %element.name, "no body to instrument, skipping");
            continue;
        }

        match MarkerConfig::from_attribute(&element.marker) {
            Ok(config) => discovery.marked.push(MarkedCallable {
                id: element.id,
                span: element.marker.span(),
                name: element.name,
                owner: element.owner,
                config,
                is_const: element.is_const,
            }),
            Err(err) => discovery.rejected.push(Rejected {
                id: element.id,
                name: element.name.to_string(),
                owner: element.owner,
                span: err.span(),
                error: EngineError::Marker(err),
            }),
        }
    }

    debug!(
        marked = discovery.marked.len(),
        rejected = discovery.rejected.len(),
        "discovered marked callables"
    );
    discovery.resolved = Some(resolved);
    discovery
}
