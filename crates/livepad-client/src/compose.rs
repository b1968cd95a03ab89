//! Snippet composition: offset instrumentation and wrap templates.
//!
//! Before compilation, every top-level statement of the user's snippet gets
//! a `ctx.track_offset(N);` call spliced in front of it, where `N` is the
//! statement's zero-based character offset in the snippet as the user wrote
//! it, not in the instrumented or wrapped source.
//! When execution faults, the engine reports the last tracked offset, and
//! the editor maps it straight back to a source position.

use proc_macro2::LineColumn;
use syn::spanned::Spanned;

/// How the user's fragment is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// A sequence of statements; instrumented per statement.
    Statements,
    /// A single expression; wrapped in an implicit dump, not instrumented.
    Expression,
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("snippet does not parse as {kind}: {source}")]
    Parse {
        kind: &'static str,
        source: syn::Error,
    },
}

const STATEMENTS_PLACEHOLDER: &str = "__STATEMENTS_HERE__";

/// The complete snippet crate skeleton. Compiled as a cdylib linking
/// livepad-runtime; the exported entry point is what the engine resolves.
const WRAP_BASE: &str = r#"use std::any::Any;

use livepad_runtime::prelude::*;

#[no_mangle]
pub fn livepad_snippet_main(host: &mut dyn Any, ctx: &mut SnippetContext) {
    let _ = &host;
__STATEMENTS_HERE__
}
"#;

/// Instrument + wrap a fragment into a full compilable source.
pub fn compose(src: &str, kind: CodeKind) -> Result<String, ComposeError> {
    let body = match kind {
        CodeKind::Statements => instrument(src)?,
        CodeKind::Expression => {
            let expr: syn::Expr = syn::parse_str(src).map_err(|source| ComposeError::Parse {
                kind: "an expression",
                source,
            })?;
            let _ = expr;
            format!("let __value = {{ {src} }};\n    ctx.dump(\"expression\", __value);")
        }
    };
    Ok(WRAP_BASE.replace(STATEMENTS_PLACEHOLDER, &indent(&body)))
}

/// Splice a tracking call before every top-level statement.
pub fn instrument(src: &str) -> Result<String, ComposeError> {
    let offsets = statement_offsets(src)?;
    let mut out = src.to_string();
    // Back to front so earlier byte positions stay valid while splicing.
    for &offset in offsets.iter().rev() {
        let byte = char_to_byte_index(src, offset);
        out.insert_str(byte, &format!("ctx.track_offset({offset}); "));
    }
    Ok(out)
}

/// Zero-based character offsets of the snippet's top-level statements,
/// in source order.
pub fn statement_offsets(src: &str) -> Result<Vec<usize>, ComposeError> {
    // Brace-wrap so the fragment parses as a block. The wrapper adds one
    // line above the snippet, accounted for in the offset math below.
    let wrapped = format!("{{\n{src}\n}}");
    let block: syn::Block = syn::parse_str(&wrapped).map_err(|source| ComposeError::Parse {
        kind: "statements",
        source,
    })?;

    let mut offsets = Vec::new();
    for stmt in &block.stmts {
        if let Some(offset) = line_col_to_offset(src, stmt.span().start()) {
            offsets.push(offset);
        }
    }
    Ok(offsets)
}

/// Map a span position in the brace-wrapped text back to a character
/// offset in the original snippet. Lines shift down by one; columns are
/// already character-based.
fn line_col_to_offset(src: &str, position: LineColumn) -> Option<usize> {
    let line_in_src = position.line.checked_sub(2)?;
    let mut offset = 0usize;
    for (index, line) in src.split('\n').enumerate() {
        if index == line_in_src {
            return Some(offset + position.column);
        }
        offset += line.chars().count() + 1;
    }
    None
}

fn char_to_byte_index(src: &str, char_offset: usize) -> usize {
    src.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(src.len())
}

fn indent(body: &str) -> String {
    body.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
