//! Import scanning for the reference pipeline.
//!
//! Recognises just enough module syntax to build a graph:
//!
//! ```text
//! import "./a";                       normal
//! import x from "./b";                normal
//! import(/* chunkName: "c" */ "./c")  dynamic, chunk named "c"
//! ```

/// How a module is imported.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImportKind {
    Static,
    Dynamic,
}

/// One import found in a module's source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub specifier: String,
    pub kind: ImportKind,
    /// Chunk name requested through a `chunkName` comment.
    pub chunk_name: Option<String>,
}

/// Scan `source` for imports, in source order.
pub fn scan_imports(source: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    let mut rest = source;

    while let Some(at) = rest.find("import") {
        let before = &rest[..at];
        let after = &rest[at + "import".len()..];
        rest = after;

        if before.chars().next_back().is_some_and(is_ident_char)
            || after.chars().next().is_some_and(is_ident_char)
        {
            continue;
        }

        let after = after.trim_start();
        let import = match after.strip_prefix('(') {
            Some(args) => scan_dynamic(args),
            None => scan_static(after),
        };
        if let Some(import) = import {
            imports.push(import);
        }
    }

    imports
}

fn scan_dynamic(args: &str) -> Option<Import> {
    let mut chunk_name = None;
    let mut args = args.trim_start();
    while let Some(comment) = args.strip_prefix("/*") {
        let end = comment.find("*/")?;
        chunk_name = chunk_name.or_else(|| chunk_name_in(&comment[..end]));
        args = comment[end + 2..].trim_start();
    }
    let (specifier, _) = string_literal(args)?;
    Some(Import {
        specifier,
        kind: ImportKind::Dynamic,
        chunk_name,
    })
}

fn scan_static(clause: &str) -> Option<Import> {
    let end = clause.find([';', '\n']).unwrap_or(clause.len());
    let clause = &clause[..end];
    let start = clause.find(['"', '\''])?;
    let (specifier, _) = string_literal(&clause[start..])?;
    Some(Import {
        specifier,
        kind: ImportKind::Static,
        chunk_name: None,
    })
}

fn chunk_name_in(comment: &str) -> Option<String> {
    let at = comment.to_ascii_lowercase().find("chunkname")?;
    let value = comment[at + "chunkname".len()..].trim_start().strip_prefix(':')?;
    string_literal(value.trim_start()).map(|(name, _)| name)
}

/// Parse a quoted string at the start of `text`, returning it and the rest.
fn string_literal(text: &str) -> Option<(String, &str)> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &text[1..];
    let end = body.find(quote)?;
    Some((body[..end].to_owned(), &body[end + 1..]))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
