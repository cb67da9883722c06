//! Implementation of the `#[laptime::instrument]` attribute macro.
//!
//! This macro is placed on an impl block, a trait, an inline module or a
//! function and:
//! - Runs one engine round over the item, with `#[time]` always in scope
//! - Strips the consumed `#[time]` markers
//! - Appends one companion struct per enclosing type, in the module of that type
//! - Turns engine errors into `compile_error!`s

use std::io;

use laptime_engine::{
    ArtifactEmitter, CollectedDiagnostics, CompanionArtifact, EngineConfig, MarkerScope, SourceTree,
};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::Parser;
use syn::{parse2, Error, Item, ItemMod, LitStr, Path, Result};

use crate::probes;

/// Arguments of `#[instrument(...)]`.
#[derive(Default)]
struct InstrumentArgs {
    clock: Option<Path>,
    runtime: Option<Path>,
    suffix: Option<LitStr>,
}

impl InstrumentArgs {
    fn parse(attr: TokenStream) -> Result<Self> {
        let mut args = Self::default();
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("clock") {
                args.clock = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("runtime") {
                args.runtime = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("suffix") {
                let suffix: LitStr = meta.value()?.parse()?;
                // The suffix is glued onto a type name, so it must keep it an identifier.
                if syn::parse_str::<syn::Ident>(&format!("X{}", suffix.value())).is_err() {
                    return Err(Error::new_spanned(
                        &suffix,
                        "suffix must continue a type name, e.g. \"Autogenerate\"",
                    ));
                }
                args.suffix = Some(suffix);
                Ok(())
            } else {
                Err(meta.error("unknown argument, expected `clock`, `runtime` or `suffix`"))
            }
        });
        parser.parse2(attr)?;
        Ok(args)
    }

    fn into_config(self) -> EngineConfig {
        let mut config = EngineConfig::default().strip_markers(true);
        if let Some(runtime) = self.runtime {
            // Without an explicit clock, read the system clock of that runtime.
            let clock: Path = syn::parse_quote!(#runtime::SystemClock);
            config = config.with_runtime(runtime).with_clock(clock);
        }
        if let Some(clock) = self.clock {
            config = config.with_clock(clock);
        }
        if let Some(suffix) = self.suffix {
            config = config.with_companion_suffix(suffix.value());
        }
        config
    }
}

/// Keeps companion artifacts so they can be placed as items after the round.
#[derive(Default)]
struct InlineEmitter {
    artifacts: Vec<CompanionArtifact>,
}

impl ArtifactEmitter for InlineEmitter {
    fn emit(&mut self, artifact: &CompanionArtifact) -> io::Result<()> {
        self.artifacts.push(artifact.clone());
        Ok(())
    }
}

/// Main entry point for the instrument attribute macro.
pub fn expand(attr: TokenStream, item: TokenStream) -> Result<TokenStream> {
    let args = InstrumentArgs::parse(attr)?;
    let item: Item = parse2(item)?;
    check_target(&item)?;

    let mut tree = SourceTree::new(vec![item], Vec::new(), MarkerScope::Assumed);
    let mut engine = probes::engine(args.into_config(), tree.len());
    let mut diagnostics = CollectedDiagnostics::new();
    let mut emitter = InlineEmitter::default();
    engine.run_round(&mut tree, &mut diagnostics, &mut emitter);
    probes::finish(&engine);

    let mut items = tree.into_items();
    for artifact in &emitter.artifacts {
        place_companion(&mut items, &artifact.namespace, artifact.items());
    }

    let errors = diagnostics.errors().map(|diagnostic| {
        let span = diagnostic.span.unwrap_or_else(Span::call_site);
        Error::new(span, &diagnostic.message).to_compile_error()
    });

    Ok(quote! {
        #(#items)*
        #(#errors)*
    })
}

fn check_target(item: &Item) -> Result<()> {
    match item {
        Item::Impl(_) | Item::Trait(_) | Item::Fn(_) => Ok(()),
        Item::Mod(ItemMod {
            content: Some(_), ..
        }) => Ok(()),
        Item::Mod(module) => Err(Error::new_spanned(
            module,
            "laptime::instrument needs an inline module; annotate the items of the file instead",
        )),
        other => Err(Error::new_spanned(
            other,
            "laptime::instrument can only be applied to an impl, trait, inline module or fn",
        )),
    }
}

/// Appends `companion` to the inline module reached by `namespace`, or to
/// `items` itself for an empty namespace.
fn place_companion(items: &mut Vec<Item>, namespace: &[String], companion: Vec<Item>) {
    let Some((first, rest)) = namespace.split_first() else {
        items.extend(companion);
        return;
    };
    let module = items.iter_mut().find_map(|item| match item {
        Item::Mod(ItemMod {
            ident,
            content: Some((_, inner)),
            ..
        }) if ident == first => Some(inner),
        _ => None,
    });
    match module {
        Some(inner) => place_companion(inner, rest, companion),
        None => items.extend(companion),
    }
}
