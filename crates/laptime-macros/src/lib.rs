//! # laptime Macros
//!
//! Procedural macros for laptime.
//!
//! This crate is not meant to be used directly. Instead, use the `laptime`
//! crate which re-exports these macros together with the runtime the
//! generated code calls into.
//!
//! Both attributes are thin hosts around `laptime-engine`: they parse the
//! annotated item, hand it to the engine and give the rewritten item back to
//! the compiler. Problems found by the engine become `compile_error!`s at the
//! offending span, next to the item that was still emitted.

use proc_macro::TokenStream;

mod instrument;
mod probes;
mod time;

/// Instruments every `#[time]` function inside an item.
///
/// Goes on an `impl` block, a `trait`, an inline `mod` or a single `fn`.
/// Each function marked with `#[time]` gets its body rewritten to print how
/// long the call took, and every type that owns at least one such function
/// gets a companion `<Type>Autogenerate` struct next to it.
///
/// # Arguments
///
/// - `clock = path`: the type implementing `laptime::Clock` to read
///   (default `::laptime::SystemClock`)
/// - `runtime = path`: where the `laptime` crate lives, for re-exports
///   (default `::laptime`)
/// - `suffix = "..."`: companion name suffix (default `"Autogenerate"`)
///
/// # Example
///
/// ```rust,ignore
/// use laptime::time;
///
/// struct Invoice { lines: Vec<u64> }
///
/// #[laptime::instrument]
/// impl Invoice {
///     #[time(format = "total took %s ms")]
///     fn total(&self) -> u64 {
///         self.lines.iter().sum()
///     }
/// }
///
/// // Also generated:
/// // pub struct InvoiceAutogenerate { .. }
/// ```
#[proc_macro_attribute]
pub fn instrument(attr: TokenStream, item: TokenStream) -> TokenStream {
    instrument::expand(attr.into(), item.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Reports how long each call of a function takes.
///
/// Used on its own, it rewrites one function (or method) and generates no
/// companion. Inside an item annotated with [`macro@instrument`] it is a marker
/// consumed by that macro.
///
/// # Arguments
///
/// - `clock = millisecond | nanosecond` (alias `interval`, default `millisecond`)
/// - `format = "..."` (alias `message`): the printed line, with one `%s`,
///   `%d` or `{}` where the elapsed time goes (default `"Elapsed %s"`)
///
/// # Example
///
/// ```rust,ignore
/// #[laptime::time(clock = nanosecond, format = "parse took %s ns")]
/// fn parse(input: &str) -> Vec<&str> {
///     input.split(',').collect()
/// }
/// ```
#[proc_macro_attribute]
pub fn time(attr: TokenStream, item: TokenStream) -> TokenStream {
    time::expand(attr.into(), item.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
