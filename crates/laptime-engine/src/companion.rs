//! Companion artifacts: one placeholder type per enclosing type that owns
//! instrumented callables.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::{parse_quote, Item};

use crate::host::Owner;

/// A generated `<Type><Suffix>` unit living next to the type that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionArtifact {
    pub namespace: Vec<String>,
    pub type_name: Ident,
    /// Qualified name of the callable that caused the artifact, e.g. `Foo::compute`.
    pub origin: String,
}

impl CompanionArtifact {
    pub fn for_owner(owner: &Owner, origin: impl Into<String>, suffix: &str) -> Self {
        Self {
            namespace: owner.namespace.clone(),
            type_name: format_ident!("{}{}", owner.name, suffix),
            origin: origin.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        let mut parts = self.namespace.clone();
        parts.push(self.type_name.to_string());
        parts.join("::")
    }

    /// File stem for the artifact's source unit (`FooAutogenerate` becomes `foo_autogenerate`).
    pub fn file_stem(&self) -> String {
        to_snake_case(&self.type_name.to_string())
    }

    pub fn provenance(&self) -> String {
        format!("Generated by laptime for `{}`.", self.origin)
    }

    /// The struct and its private constructor.
    pub fn items(&self) -> Vec<Item> {
        let name = &self.type_name;
        let doc = self.provenance();

        vec![
            parse_quote! {
                #[doc = #doc]
                #[allow(dead_code)]
                pub struct #name {
                    _private: (),
                }
            },
            parse_quote! {
                #[allow(dead_code)]
                impl #name {
                    fn new() -> Self {
                        Self { _private: () }
                    }
                }
            },
        ]
    }

    pub fn to_tokens(&self) -> TokenStream {
        let items = self.items();
        quote! { #(#items)* }
    }

    /// Full source text of the artifact, starting with a provenance comment.
    pub fn render(&self) -> String {
        let file = syn::File {
            shebang: None,
            attrs: Vec::new(),
            items: self.items(),
        };
        format!("// {}\n\n{}", self.provenance(), prettyplease::unparse(&file))
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
