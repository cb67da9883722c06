//! Body rewriting.
//!
//! An instrumented body has exactly two statements:
//!
//! ```rust,ignore
//! {
//!     let __laptime_start_0: u64 = <Clock as ::laptime::Clock>::read(::laptime::ClockKind::Millisecond);
//!     {
//!         let __laptime_cleanup = ::laptime::__private::Finally::new(move || { /* read, subtract, report */ });
//!         // original statements, verbatim
//!     }
//! }
//! ```
//!
//! The cleanup guard runs its closure when it is dropped, which happens on
//! every way out of the inner block: falling off the end, `return`, `?`, or a
//! panic unwinding through it. Nothing is caught, so the original control flow
//! and the original panic are untouched.

use proc_macro2::{Ident, Span};
use quote::{format_ident, quote};
use syn::token::Brace;
use syn::{parse_quote, Block, Expr, ExprBlock, LitStr, Pat, Stmt};

use crate::config::EngineConfig;
use crate::marker::ClockKind;
use crate::probe::ProbeNames;
use crate::template::MessageTemplate;

/// Name of the binding that holds the cleanup guard inside the protected region.
pub const CLEANUP_BINDING: &str = "__laptime_cleanup";

/// Expression reading the configured clock with the given kind.
pub fn clock_read(config: &EngineConfig, kind: ClockKind) -> Expr {
    let runtime = &config.runtime;
    let clock = &config.clock;
    let variant = format_ident!("{}", kind.variant());
    parse_quote! {
        <#clock as #runtime::Clock>::read(#runtime::ClockKind::#variant)
    }
}

/// Builds the instrumented replacement for `original`.
///
/// Pure: `original` is not modified; the caller installs the returned block.
pub fn instrument_block(
    original: &Block,
    probe: &Ident,
    kind: ClockKind,
    template: &MessageTemplate,
    config: &EngineConfig,
) -> Block {
    let runtime = &config.runtime;
    let read = clock_read(config, kind);
    let literal = LitStr::new(&template.format_literal(), Span::call_site());
    let cleanup = format_ident!("{}", CLEANUP_BINDING);

    let probe_stmt: Stmt = parse_quote! {
        let #probe: u64 = #read;
    };

    let guard_stmt: Stmt = parse_quote! {
        let #cleanup = #runtime::__private::Finally::new(move || {
            let elapsed: u64 = #read.saturating_sub(#probe);
            #runtime::__private::report(::core::format_args!(#literal, elapsed));
        });
    };

    let mut guarded = Vec::with_capacity(original.stmts.len() + 1);
    guarded.push(guard_stmt);
    guarded.extend(original.stmts.iter().cloned());

    let protected = Stmt::Expr(
        Expr::Block(ExprBlock {
            attrs: Vec::new(),
            label: None,
            block: Block {
                brace_token: Brace::default(),
                stmts: guarded,
            },
        }),
        None,
    );

    Block {
        brace_token: original.brace_token,
        stmts: vec![probe_stmt, protected],
    }
}

/// Whether `body` already has the shape produced by [`instrument_block`]: a
/// probe binding followed by a block that opens with the cleanup guard.
pub fn is_instrumented(body: &Block, probes: &ProbeNames) -> bool {
    let [Stmt::Local(probe), Stmt::Expr(Expr::Block(region), None)] = body.stmts.as_slice() else {
        return false;
    };
    let Some(Stmt::Local(guard)) = region.block.stmts.first() else {
        return false;
    };
    binding(probe).is_some_and(|ident| probes.is_probe(ident))
        && binding(guard).is_some_and(|ident| ident == CLEANUP_BINDING)
}

fn binding(local: &syn::Local) -> Option<&Ident> {
    let pat = match &local.pat {
        Pat::Type(pat_type) => &*pat_type.pat,
        pat => pat,
    };
    match pat {
        Pat::Ident(pat_ident) => Some(&pat_ident.ident),
        _ => None,
    }
}

/// The statements guarded by the protected region of an instrumented body,
/// i.e. the original statements.
pub fn guarded_statements(body: &Block) -> Option<&[Stmt]> {
    match body.stmts.get(1)? {
        Stmt::Expr(Expr::Block(region), None) => region.block.stmts.get(1..),
        _ => None,
    }
}

/// The probe binding of an instrumented body.
pub fn probe_name(body: &Block) -> Option<&Ident> {
    let Stmt::Local(local) = body.stmts.first()? else {
        return None;
    };
    binding(local)
}

/// Renders a block for logging.
pub(crate) fn describe(block: &Block) -> String {
    quote!(#block).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(original: &Block, kind: ClockKind, template: &str) -> Block {
        let mut probes = ProbeNames::default();
        let probe = probes.fresh(original);
        instrument_block(
            original,
            &probe,
            kind,
            &MessageTemplate::parse(template).unwrap(),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_body_has_probe_and_protected_region() {
        let original: Block = parse_quote!({
            let x = compute();
            if x > 3 {
                return x;
            }
            x * 2
        });

        let body = instrument(&original, ClockKind::Millisecond, "Elapsed %s");

        assert_eq!(body.stmts.len(), 2);
        assert_eq!(probe_name(&body).unwrap(), "__laptime_start_0");
        assert_eq!(guarded_statements(&body).unwrap(), original.stmts.as_slice());
    }

    #[test]
    fn test_empty_body_is_still_wrapped() {
        let original: Block = parse_quote!({});
        let body = instrument(&original, ClockKind::Millisecond, "Elapsed %s");

        assert_eq!(body.stmts.len(), 2);
        assert!(guarded_statements(&body).unwrap().is_empty());
    }

    #[test]
    fn test_both_reads_use_the_same_clock_kind() {
        let original: Block = parse_quote!({ work() });
        let body = instrument(&original, ClockKind::Nanosecond, "took %s ns");
        let rendered = describe(&body);

        assert_eq!(rendered.matches("ClockKind :: Nanosecond").count(), 2);
        assert!(!rendered.contains("Millisecond"));
        assert!(rendered.contains("\"took {} ns\""));
        assert!(rendered.contains("saturating_sub (__laptime_start_0)"));
        assert!(rendered.contains(":: laptime :: __private :: Finally :: new"));
    }

    #[test]
    fn test_custom_clock_and_runtime_paths() {
        let config = EngineConfig::default()
            .with_runtime(parse_quote!(crate::rt))
            .with_clock(parse_quote!(crate::FakeClock));
        let read = clock_read(&config, ClockKind::Millisecond);

        let expected: Expr = parse_quote!(
            <crate::FakeClock as crate::rt::Clock>::read(crate::rt::ClockKind::Millisecond)
        );
        assert_eq!(read, expected);
    }

    #[test]
    fn test_detects_instrumented_bodies() {
        let probes = ProbeNames::default();
        let original: Block = parse_quote!({ work() });
        let body = instrument(&original, ClockKind::Millisecond, "Elapsed %s");

        assert!(is_instrumented(&body, &probes));
        assert!(!is_instrumented(&original, &probes));

        let lookalike: Block = parse_quote!({
            let __laptime_start_x = 1;
            work()
        });
        assert!(!is_instrumented(&lookalike, &probes));
    }

    #[test]
    fn test_user_code_shaped_like_output_is_not_instrumented() {
        let probes = ProbeNames::default();

        let plain: Block = parse_quote!({
            let __laptime_start_0 = begin();
            finish(__laptime_start_0)
        });
        assert!(!is_instrumented(&plain, &probes));

        let unguarded: Block = parse_quote!({
            let __laptime_start_0 = begin();
            {
                let other = 1;
                finish(__laptime_start_0, other)
            }
        });
        assert!(!is_instrumented(&unguarded, &probes));

        let mut engine_probes = ProbeNames::default();
        let probe = engine_probes.fresh(&plain);
        let body = instrument_block(
            &plain,
            &probe,
            ClockKind::Millisecond,
            &MessageTemplate::default(),
            &EngineConfig::default(),
        );
        assert!(is_instrumented(&body, &probes));
    }

    #[test]
    fn test_original_block_is_not_modified() {
        let original: Block = parse_quote!({ a(); b() });
        let before = original.clone();
        let _ = instrument(&original, ClockKind::Millisecond, "Elapsed %s");
        assert_eq!(original, before);
    }
}
