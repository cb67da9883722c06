//! A [`ProgramModel`] over parsed Rust items.
//!
//! [`SourceTree`] owns the items of one round and indexes every callable it
//! can instrument (free functions, inherent and trait impl methods, trait
//! default methods, recursively through inline modules) into an arena of
//! slots. The engine refers to callables by slot index; the tree resolves an
//! index back to the mutable node when a body is replaced.

use proc_macro2::Ident;
use syn::{Attribute, Block, ImplItem, Item, ItemMod, Signature, TraitItem, Type, UseTree};
use tracing::trace;

use crate::error::{EngineError, Result};
use crate::host::{AnnotatedCallable, ArtifactEmitter, CallableId, Diagnostics, Owner, ProgramModel};
use crate::marker::{Marker, ResolvedMarker};
use crate::round::{Engine, RoundSummary};
use crate::splice::{preamble_len, splice};

/// How the marker becomes visible to a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerScope {
    /// The host owns the marker; it is always in scope (macro expansion).
    Assumed,
    /// The marker must be imported or referred to by its qualified path (source files).
    Imported,
}

#[derive(Debug, Clone)]
struct Slot {
    /// Item indices through enclosing inline modules, ending at the item itself.
    path: Vec<usize>,
    /// Index of the method within an impl or trait item.
    member: Option<usize>,
    owner: Option<Owner>,
}

/// Owned items of one round plus an index of their callables.
#[derive(Debug, Clone)]
pub struct SourceTree {
    shebang: Option<String>,
    attrs: Vec<Attribute>,
    items: Vec<Item>,
    scope: MarkerScope,
    slots: Vec<Slot>,
}

impl SourceTree {
    /// Indexes `items`, placing them in the module `namespace` (e.g. `["shapes"]`).
    pub fn new(items: Vec<Item>, namespace: Vec<String>, scope: MarkerScope) -> Self {
        let mut slots = Vec::new();
        index_items(&items, &mut Vec::new(), &mut namespace.clone(), &mut slots);
        Self {
            shebang: None,
            attrs: Vec::new(),
            items,
            scope,
            slots,
        }
    }

    pub fn from_file(file: syn::File, namespace: Vec<String>) -> Self {
        let mut tree = Self::new(file.items, namespace, MarkerScope::Imported);
        tree.shebang = file.shebang;
        tree.attrs = file.attrs;
        tree
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    pub fn into_file(self) -> syn::File {
        syn::File {
            shebang: self.shebang,
            attrs: self.attrs,
            items: self.items,
        }
    }

    /// Looks up a callable by name: `name` for free functions, `Type::name` for methods.
    pub fn find(&self, qualified: &str) -> Option<CallableId> {
        (0..self.slots.len()).map(CallableId).find(|&id| {
            self.callable(id)
                .is_some_and(|callable| self.display_name(id, callable.sig()) == qualified)
        })
    }

    /// The current body of a callable.
    pub fn body(&self, id: CallableId) -> Option<&Block> {
        self.callable(id)?.body()
    }

    /// The current attributes of a callable.
    pub fn attrs(&self, id: CallableId) -> Option<&[Attribute]> {
        Some(self.callable(id)?.attrs())
    }

    fn display_name(&self, id: CallableId, sig: &Signature) -> String {
        match &self.slots[id.0].owner {
            Some(owner) => format!("{}::{}", owner.name, sig.ident),
            None => sig.ident.to_string(),
        }
    }

    fn callable(&self, id: CallableId) -> Option<CallableRef<'_>> {
        let slot = self.slots.get(id.0)?;
        let item = item_at(&self.items, &slot.path)?;
        match (item, slot.member) {
            (Item::Fn(f), None) => Some(CallableRef::new(&f.attrs, &f.sig, Some(&*f.block))),
            (Item::Impl(imp), Some(member)) => match imp.items.get(member)? {
                ImplItem::Fn(f) => Some(CallableRef::new(&f.attrs, &f.sig, Some(&f.block))),
                _ => None,
            },
            (Item::Trait(tr), Some(member)) => match tr.items.get(member)? {
                TraitItem::Fn(f) => Some(CallableRef::new(&f.attrs, &f.sig, f.default.as_ref())),
                _ => None,
            },
            _ => None,
        }
    }

    fn callable_mut(&mut self, id: CallableId) -> Option<(&mut Vec<Attribute>, Option<&mut Block>)> {
        let slot = self.slots.get(id.0)?;
        let member = slot.member;
        let item = item_at_mut(&mut self.items, &slot.path)?;
        match (item, member) {
            (Item::Fn(f), None) => Some((&mut f.attrs, Some(&mut *f.block))),
            (Item::Impl(imp), Some(member)) => match imp.items.get_mut(member)? {
                ImplItem::Fn(f) => Some((&mut f.attrs, Some(&mut f.block))),
                _ => None,
            },
            (Item::Trait(tr), Some(member)) => match tr.items.get_mut(member)? {
                TraitItem::Fn(f) => Some((&mut f.attrs, f.default.as_mut())),
                _ => None,
            },
            _ => None,
        }
    }

    fn resolve_imported(&self, marker: &Marker) -> Option<ResolvedMarker> {
        let mut resolved = ResolvedMarker::default();

        for_each_item(&self.items, &mut |item| {
            if let Item::Use(item_use) = item {
                resolve_use(&item_use.tree, &mut Vec::new(), marker, &mut resolved);
            }
        });

        let qualified_in_use = (0..self.slots.len()).any(|i| {
            self.callable(CallableId(i)).is_some_and(|callable| {
                callable
                    .attrs()
                    .iter()
                    .any(|attr| marker.is_qualified(attr.path()))
            })
        });
        if qualified_in_use {
            resolved.add(vec![marker.crate_name.clone(), marker.name.clone()]);
        }

        (!resolved.is_empty()).then_some(resolved)
    }
}

impl ProgramModel for SourceTree {
    fn resolve_marker(&self, marker: &Marker) -> Option<ResolvedMarker> {
        match self.scope {
            MarkerScope::Assumed => Some(marker.assumed()),
            MarkerScope::Imported => self.resolve_imported(marker),
        }
    }

    fn annotated(&self, marker: &ResolvedMarker) -> Vec<AnnotatedCallable> {
        let mut annotated = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            let id = CallableId(index);
            let Some(callable) = self.callable(id) else {
                continue;
            };
            let Some(attr) = callable.attrs().iter().find(|attr| marker.matches(attr)) else {
                continue;
            };
            trace!(callable = %callable.sig().ident, "found marked callable");
            annotated.push(AnnotatedCallable {
                id,
                name: callable.sig().ident.clone(),
                owner: slot.owner.clone(),
                marker: attr.clone(),
                is_const: callable.sig().constness.is_some(),
                has_body: callable.body().is_some(),
            });
        }
        annotated
    }

    fn body_mut(&mut self, id: CallableId) -> Option<&mut Block> {
        self.callable_mut(id)?.1
    }

    fn attrs_mut(&mut self, id: CallableId) -> Option<&mut Vec<Attribute>> {
        Some(self.callable_mut(id)?.0)
    }
}

#[derive(Clone, Copy)]
struct CallableRef<'a> {
    attrs: &'a [Attribute],
    sig: &'a Signature,
    body: Option<&'a Block>,
}

impl<'a> CallableRef<'a> {
    fn new(attrs: &'a [Attribute], sig: &'a Signature, body: Option<&'a Block>) -> Self {
        Self { attrs, sig, body }
    }

    fn attrs(&self) -> &'a [Attribute] {
        self.attrs
    }

    fn sig(&self) -> &'a Signature {
        self.sig
    }

    fn body(&self) -> Option<&'a Block> {
        self.body
    }
}

fn index_items(items: &[Item], path: &mut Vec<usize>, namespace: &mut Vec<String>, slots: &mut Vec<Slot>) {
    for (index, item) in items.iter().enumerate() {
        path.push(index);
        match item {
            Item::Fn(_) => slots.push(Slot {
                path: path.clone(),
                member: None,
                owner: None,
            }),
            Item::Impl(imp) => {
                let owner = type_ident(&imp.self_ty).map(|name| Owner::new(name, namespace.clone()));
                for (member, impl_item) in imp.items.iter().enumerate() {
                    if let ImplItem::Fn(_) = impl_item {
                        slots.push(Slot {
                            path: path.clone(),
                            member: Some(member),
                            owner: owner.clone(),
                        });
                    }
                }
            }
            Item::Trait(tr) => {
                let owner = Owner::new(tr.ident.clone(), namespace.clone());
                for (member, trait_item) in tr.items.iter().enumerate() {
                    if let TraitItem::Fn(_) = trait_item {
                        slots.push(Slot {
                            path: path.clone(),
                            member: Some(member),
                            owner: Some(owner.clone()),
                        });
                    }
                }
            }
            Item::Mod(ItemMod {
                ident,
                content: Some((_, inner)),
                ..
            }) => {
                namespace.push(ident.to_string());
                index_items(inner, path, namespace, slots);
                namespace.pop();
            }
            _ => {}
        }
        path.pop();
    }
}

fn item_at<'a>(items: &'a [Item], path: &[usize]) -> Option<&'a Item> {
    let (first, rest) = path.split_first()?;
    let item = items.get(*first)?;
    if rest.is_empty() {
        return Some(item);
    }
    match item {
        Item::Mod(ItemMod {
            content: Some((_, inner)),
            ..
        }) => item_at(inner, rest),
        _ => None,
    }
}

fn item_at_mut<'a>(items: &'a mut [Item], path: &[usize]) -> Option<&'a mut Item> {
    let (first, rest) = path.split_first()?;
    let item = items.get_mut(*first)?;
    if rest.is_empty() {
        return Some(item);
    }
    match item {
        Item::Mod(ItemMod {
            content: Some((_, inner)),
            ..
        }) => item_at_mut(inner, rest),
        _ => None,
    }
}

fn for_each_item(items: &[Item], f: &mut impl FnMut(&Item)) {
    for item in items {
        f(item);
        if let Item::Mod(ItemMod {
            content: Some((_, inner)),
            ..
        }) = item
        {
            for_each_item(inner, f);
        }
    }
}

/// Adds the local names a `use` tree gives the marker.
fn resolve_use(tree: &UseTree, prefix: &mut Vec<String>, marker: &Marker, out: &mut ResolvedMarker) {
    let in_crate = prefix.len() == 1 && prefix[0] == marker.crate_name;
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            resolve_use(&path.tree, prefix, marker, out);
            prefix.pop();
        }
        UseTree::Name(name) if in_crate && name.ident == marker.name => {
            out.add(vec![marker.name.clone()]);
        }
        UseTree::Name(name) if prefix.is_empty() && name.ident == marker.crate_name => {
            out.add(vec![marker.crate_name.clone(), marker.name.clone()]);
        }
        UseTree::Rename(rename) if in_crate && rename.ident == marker.name => {
            out.add(vec![rename.rename.to_string()]);
        }
        UseTree::Rename(rename) if prefix.is_empty() && rename.ident == marker.crate_name => {
            out.add(vec![rename.rename.to_string(), marker.name.clone()]);
        }
        UseTree::Glob(_) if in_crate => out.add(vec![marker.name.clone()]),
        UseTree::Group(group) => {
            for tree in &group.items {
                resolve_use(tree, prefix, marker, out);
            }
        }
        _ => {}
    }
}

/// Simple name of an impl's self type (`Foo` for `Foo<T>`, `a::Foo` or `&Foo`).
fn type_ident(ty: &Type) -> Option<Ident> {
    match ty {
        Type::Path(tp) => tp.path.segments.last().map(|seg| seg.ident.clone()),
        Type::Reference(reference) => type_ident(&reference.elem),
        Type::Paren(paren) => type_ident(&paren.elem),
        Type::Group(group) => type_ident(&group.elem),
        _ => None,
    }
}

/// Instruments one source file.
///
/// Parses `source`, runs a round over it with `namespace` as the file's module
/// path, and writes the rewritten bodies back into a copy of `source`. Text
/// outside rewritten bodies is returned unchanged. Only a parse failure is an
/// error; everything else goes to `diagnostics`.
pub fn instrument_source<D, E>(
    source: &str,
    namespace: Vec<String>,
    engine: &mut Engine,
    diagnostics: &mut D,
    emitter: &mut E,
) -> Result<(String, RoundSummary)>
where
    D: Diagnostics + ?Sized,
    E: ArtifactEmitter + ?Sized,
{
    let offset = preamble_len(source);
    let file = syn::parse_file(&source[offset..]).map_err(EngineError::Parse)?;
    let mut tree = SourceTree::from_file(file, namespace);
    let original = tree.clone();
    let summary = engine.run_round(&mut tree, diagnostics, emitter);
    Ok((splice(source, offset, &original, &tree), summary))
}
