//! Writing a round's changes back into the original source text.
//!
//! Only rewritten bodies and removed marker attributes are replaced. Every
//! other byte of the file is kept, comments and formatting included. Inside a
//! rewritten body the original statements are kept as written, too; only the
//! probe and the cleanup guard are new text.

use std::ops::Range;

use proc_macro2::Span;
use syn::{parse_quote, Attribute, Block, Expr, Item, Stmt};

use crate::host::CallableId;
use crate::source::SourceTree;
use crate::transform::guarded_statements;

const INDENT: &str = "    ";

struct Edit {
    range: Range<usize>,
    text: String,
}

/// Length of what `syn::parse_file` skips before parsing: a byte order mark
/// and a shebang line.
pub(crate) fn preamble_len(source: &str) -> usize {
    let body = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut offset = source.len() - body.len();
    if body.starts_with("#!") && !body[2..].trim_start().starts_with('[') {
        offset += body.find('\n').unwrap_or(body.len());
    }
    offset
}

/// Applies the differences between `before` and `after` to `source`.
///
/// Both trees must come from parsing `source[offset..]`, `after` being
/// `before` after a round.
pub(crate) fn splice(source: &str, offset: usize, before: &SourceTree, after: &SourceTree) -> String {
    let mut edits = Vec::new();
    for id in (0..before.len()).map(CallableId) {
        if let (Some(old), Some(new)) = (before.body(id), after.body(id)) {
            if old != new {
                edits.push(body_edit(source, offset, old, new));
            }
        }
        if let (Some(old), Some(new)) = (before.attrs(id), after.attrs(id)) {
            for attr in old.iter().filter(|attr| !new.contains(attr)) {
                edits.push(attr_edit(source, offset, attr));
            }
        }
    }

    edits.sort_by_key(|edit| edit.range.start);
    let mut output = source.to_string();
    for edit in edits.into_iter().rev() {
        output.replace_range(edit.range, &edit.text);
    }
    output
}

fn located(span: Span, offset: usize) -> Range<usize> {
    let range = span.byte_range();
    range.start + offset..range.end + offset
}

fn body_edit(source: &str, offset: usize, old: &Block, new: &Block) -> Edit {
    let range = located(old.brace_token.span.join(), offset);
    let indent = line_indent(source, range.start);
    let text = match rewrite_parts(old, new) {
        Some((probe, guard)) => {
            let inner = &source[range.start + 1..range.end - 1];
            wrap_original(inner, &indent, probe, guard)
        }
        None => render_block(new, &indent),
    };
    Edit { range, text }
}

/// The probe and guard statements, if `new` wraps the statements of `old`.
fn rewrite_parts<'a>(old: &Block, new: &'a Block) -> Option<(&'a Stmt, &'a Stmt)> {
    if guarded_statements(new)? != old.stmts.as_slice() {
        return None;
    }
    match new.stmts.as_slice() {
        [probe, Stmt::Expr(Expr::Block(region), None)] => Some((probe, region.block.stmts.first()?)),
        _ => None,
    }
}

/// `{ probe; { guard; <inner> } }`, with `inner` copied verbatim.
fn wrap_original(inner: &str, indent: &str, probe: &Stmt, guard: &Stmt) -> String {
    let body_indent = format!("{indent}{INDENT}");
    let region_indent = format!("{body_indent}{INDENT}");

    let mut text = String::from("{");
    for line in render_stmts(std::slice::from_ref(probe)) {
        push_line(&mut text, &body_indent, &line);
    }
    push_line(&mut text, &body_indent, "{");
    for line in render_stmts(std::slice::from_ref(guard)) {
        push_line(&mut text, &region_indent, &line);
    }

    let inner = inner.trim_end();
    if !inner.trim_start().is_empty() {
        if inner.trim_start_matches([' ', '\t']).starts_with(['\n', '\r']) {
            text.push_str(inner);
        } else {
            push_line(&mut text, &region_indent, inner.trim_start());
        }
    }

    push_line(&mut text, &body_indent, "}");
    push_line(&mut text, indent, "}");
    text
}

fn render_block(block: &Block, indent: &str) -> String {
    let lines = render_stmts(&block.stmts);
    if lines.is_empty() {
        return "{}".to_string();
    }
    let body_indent = format!("{indent}{INDENT}");
    let mut text = String::from("{");
    for line in lines {
        push_line(&mut text, &body_indent, &line);
    }
    push_line(&mut text, indent, "}");
    text
}

/// Pretty-printed statements, one entry per line, without base indentation.
fn render_stmts(stmts: &[Stmt]) -> Vec<String> {
    let block = Block {
        brace_token: Default::default(),
        stmts: stmts.to_vec(),
    };
    let function: Item = parse_quote!(fn __laptime_splice() #block);
    let text = prettyplease::unparse(&syn::File {
        shebang: None,
        attrs: Vec::new(),
        items: vec![function],
    });

    // Drop the wrapper's signature line and its closing brace.
    let lines: Vec<&str> = text.lines().collect();
    lines
        .get(1..lines.len().saturating_sub(1))
        .unwrap_or_default()
        .iter()
        .map(|line| line.strip_prefix(INDENT).unwrap_or(line).to_string())
        .collect()
}

fn push_line(text: &mut String, indent: &str, line: &str) {
    text.push('\n');
    if !line.is_empty() {
        text.push_str(indent);
        text.push_str(line);
    }
}

fn line_start(source: &str, pos: usize) -> usize {
    source[..pos].rfind('\n').map_or(0, |newline| newline + 1)
}

fn line_indent(source: &str, pos: usize) -> String {
    source[line_start(source, pos)..pos]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Removes an attribute, and its whole line when nothing else is on it.
fn attr_edit(source: &str, offset: usize, attr: &Attribute) -> Edit {
    let mut start = located(attr.pound_token.spans[0], offset).start;
    let mut end = located(attr.bracket_token.span.join(), offset).end;

    let rest = &source[end..];
    end += rest.len() - rest.trim_start_matches([' ', '\t']).len();

    let line = line_start(source, start);
    if source[line..start].trim().is_empty() {
        let newline = if source[end..].starts_with("\r\n") {
            2
        } else {
            usize::from(source[end..].starts_with('\n'))
        };
        if newline > 0 {
            start = line;
            end += newline;
        }
    }

    Edit {
        range: start..end,
        text: String::new(),
    }
}
