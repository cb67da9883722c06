//! The `#[time]` marker: its identity and its arguments.

use std::fmt;
use std::str::FromStr;

use proc_macro2::TokenStream;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Expr, ExprLit, ExprPath, Lit, LitStr, Path};

use crate::template::{MessageTemplate, DEFAULT_TEMPLATE};

/// Time source selected by the marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ClockKind {
    /// Monotonic reading in milliseconds.
    #[default]
    Millisecond,
    /// Monotonic high-resolution reading in nanoseconds.
    Nanosecond,
}

impl ClockKind {
    /// Variant name of the matching `laptime::ClockKind`.
    pub fn variant(&self) -> &'static str {
        match self {
            ClockKind::Millisecond => "Millisecond",
            ClockKind::Nanosecond => "Nanosecond",
        }
    }
}

impl FromStr for ClockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "millisecond" | "milliseconds" | "ms" => Ok(ClockKind::Millisecond),
            "nanosecond" | "nanoseconds" | "ns" => Ok(ClockKind::Nanosecond),
            _ => Err(format!(
                "unknown clock `{s}`, expected `millisecond` or `nanosecond`"
            )),
        }
    }
}

impl fmt::Display for ClockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockKind::Millisecond => write!(f, "millisecond"),
            ClockKind::Nanosecond => write!(f, "nanosecond"),
        }
    }
}

/// Arguments of one `#[time(...)]` marker.
///
/// The template is kept as written; it is validated when the callable is
/// instrumented, not when the marker is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerConfig {
    pub clock_kind: ClockKind,
    pub message_template: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            clock_kind: ClockKind::default(),
            message_template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl MarkerConfig {
    /// Reads the configuration from a marker attribute.
    ///
    /// `#[time]` yields the defaults; `#[time(clock = nanosecond, format = "took %s ns")]`
    /// overrides them.
    pub fn from_attribute(attr: &Attribute) -> syn::Result<Self> {
        let mut config = Self::default();
        if matches!(attr.meta, syn::Meta::Path(_)) {
            return Ok(config);
        }
        attr.parse_nested_meta(|meta| config.apply(meta))?;
        Ok(config)
    }

    /// Reads the configuration from bare attribute arguments, as handed to an
    /// attribute macro.
    pub fn from_args(args: TokenStream) -> syn::Result<Self> {
        let mut config = Self::default();
        if args.is_empty() {
            return Ok(config);
        }
        let parser = syn::meta::parser(|meta| config.apply(meta));
        syn::parse::Parser::parse2(parser, args)?;
        Ok(config)
    }

    /// Validated form of the message template.
    pub fn template(&self) -> Result<MessageTemplate, crate::template::TemplateError> {
        MessageTemplate::parse(&self.message_template)
    }

    fn apply(&mut self, meta: ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("clock") || meta.path.is_ident("interval") {
            let value: Expr = meta.value()?.parse()?;
            let name = match &value {
                Expr::Path(ExprPath { path, .. }) => path
                    .segments
                    .last()
                    .map(|segment| segment.ident.to_string())
                    .unwrap_or_default(),
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => lit.value(),
                _ => return Err(syn::Error::new_spanned(value, "expected a clock name")),
            };
            self.clock_kind = name
                .parse()
                .map_err(|err: String| syn::Error::new_spanned(&value, err))?;
            Ok(())
        } else if meta.path.is_ident("format") || meta.path.is_ident("message") {
            let template: LitStr = meta.value()?.parse()?;
            self.message_template = template.value();
            Ok(())
        } else {
            Err(meta.error("unknown `time` argument, expected `clock` or `format`"))
        }
    }
}

/// Identity of the marker attribute: the crate that exports it and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub crate_name: String,
    pub name: String,
}

impl Default for Marker {
    fn default() -> Self {
        Self {
            crate_name: "laptime".to_string(),
            name: "time".to_string(),
        }
    }
}

impl Marker {
    /// Resolution used when the host itself owns the marker, e.g. inside a
    /// macro expansion: both the bare name and the qualified path denote it.
    pub fn assumed(&self) -> ResolvedMarker {
        let mut resolved = ResolvedMarker::default();
        resolved.add(vec![self.name.clone()]);
        resolved.add(vec![self.crate_name.clone(), self.name.clone()]);
        resolved
    }

    /// Whether `path` is the fully qualified marker path (`laptime::time`,
    /// with or without a leading `::`).
    pub fn is_qualified(&self, path: &Path) -> bool {
        let segments = path_segments(path);
        segments.len() == 2 && segments[0] == self.crate_name && segments[1] == self.name
    }
}

/// The attribute paths that denote the marker within one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMarker {
    paths: Vec<Vec<String>>,
}

impl ResolvedMarker {
    pub fn add(&mut self, path: Vec<String>) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn matches(&self, attr: &Attribute) -> bool {
        let segments = path_segments(attr.path());
        self.paths.iter().any(|path| *path == segments)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn path_segments(path: &Path) -> Vec<String> {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect()
}
