//! Names for the start-time bindings inserted into instrumented bodies.

use std::collections::HashSet;

use proc_macro2::{Ident, Span};
use syn::visit::{self, Visit};
use syn::Block;

/// Default prefix of probe variable names.
pub const DEFAULT_PROBE_PREFIX: &str = "__laptime_start_";

/// Hands out probe names from a counter scoped to one engine instance.
///
/// Names are `<prefix><n>` with `n` strictly increasing, so no two callables
/// instrumented by the same engine share a probe name. A candidate that
/// already occurs as an identifier in the body being instrumented is skipped.
#[derive(Debug, Clone)]
pub struct ProbeNames {
    prefix: String,
    next: u64,
}

impl ProbeNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 0)
    }

    /// Counts from `start` instead of zero, e.g. to continue numbering across
    /// several engines of one compilation unit.
    pub fn starting_at(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: start,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The number the next fresh name will try first.
    pub fn next_number(&self) -> u64 {
        self.next
    }

    /// Returns a fresh name that does not occur anywhere in `body`.
    pub fn fresh(&mut self, body: &Block) -> Ident {
        let taken = collect_idents(body);
        loop {
            let candidate = format!("{}{}", self.prefix, self.next);
            self.next += 1;
            if !taken.contains(&candidate) {
                return Ident::new(&candidate, Span::call_site());
            }
        }
    }

    /// Whether `ident` looks like a probe produced with this prefix.
    pub fn is_probe(&self, ident: &Ident) -> bool {
        ident
            .to_string()
            .strip_prefix(&self.prefix)
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl Default for ProbeNames {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_PREFIX)
    }
}

fn collect_idents(body: &Block) -> HashSet<String> {
    struct Idents(HashSet<String>);

    impl<'ast> Visit<'ast> for Idents {
        fn visit_ident(&mut self, ident: &'ast Ident) {
            self.0.insert(ident.to_string());
        }

        // Macro bodies are opaque token streams; look inside them too.
        fn visit_macro(&mut self, mac: &'ast syn::Macro) {
            collect_token_idents(mac.tokens.clone(), &mut self.0);
            visit::visit_macro(self, mac);
        }
    }

    let mut idents = Idents(HashSet::new());
    idents.visit_block(body);
    idents.0
}

fn collect_token_idents(tokens: proc_macro2::TokenStream, out: &mut HashSet<String>) {
    for tree in tokens {
        match tree {
            proc_macro2::TokenTree::Ident(ident) => {
                out.insert(ident.to_string());
            }
            proc_macro2::TokenTree::Group(group) => collect_token_idents(group.stream(), out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_names_are_distinct() {
        let mut names = ProbeNames::default();
        let body: Block = parse_quote!({ 1 + 1 });

        let generated: Vec<String> = (0..50).map(|_| names.fresh(&body).to_string()).collect();
        let unique: HashSet<&String> = generated.iter().collect();

        assert_eq!(unique.len(), generated.len());
        assert_eq!(generated[0], "__laptime_start_0");
        assert_eq!(generated[49], "__laptime_start_49");
    }

    #[test]
    fn test_skips_names_used_in_body() {
        let mut names = ProbeNames::default();
        let body: Block = parse_quote!({
            let __laptime_start_0 = 1;
            println!("{}", __laptime_start_1);
            __laptime_start_0
        });

        assert_eq!(names.fresh(&body).to_string(), "__laptime_start_2");
    }

    #[test]
    fn test_starting_at_continues_numbering() {
        let body: Block = parse_quote!({});
        let mut first = ProbeNames::default();
        first.fresh(&body);
        first.fresh(&body);

        let mut second = ProbeNames::starting_at(DEFAULT_PROBE_PREFIX, first.next_number());
        assert_eq!(second.fresh(&body).to_string(), "__laptime_start_2");
        assert_eq!(second.next_number(), 3);
    }

    #[test]
    fn test_is_probe() {
        let names = ProbeNames::new("__t_");
        assert!(names.is_probe(&Ident::new("__t_12", Span::call_site())));
        assert!(!names.is_probe(&Ident::new("__t_", Span::call_site())));
        assert!(!names.is_probe(&Ident::new("__t_x", Span::call_site())));
        assert!(!names.is_probe(&Ident::new("start", Span::call_site())));
    }
}
