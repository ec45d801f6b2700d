//! Gettext `.po`/`.pot` text rendering.

use crate::model::MessageEntry;
use std::fmt::Write as _;

/// What goes in the `msgstr` slots of one rendered entry.
pub struct RenderedEntry<'a> {
    pub entry: &'a MessageEntry,
    /// `None` renders empty msgstr slots (templates)
    pub translation: Option<&'a str>,
    pub fuzzy: bool,
}

/// Render a complete PO/POT document.
///
/// `nplurals` is the number of `msgstr[n]` slots written for plural entries.
pub fn render(metadata: &[(String, String)], entries: &[RenderedEntry<'_>], nplurals: usize) -> String {
    let mut out = String::new();

    out.push_str("msgid \"\"\nmsgstr \"\"\n");
    for (key, value) in metadata {
        let _ = writeln!(out, "\"{}\"", escape(&format!("{}: {}\n", key, value)));
    }

    for rendered in entries {
        out.push('\n');
        render_entry(&mut out, rendered, nplurals.max(1));
    }

    out
}

fn render_entry(out: &mut String, rendered: &RenderedEntry<'_>, nplurals: usize) {
    let entry = rendered.entry;

    if !entry.references.is_empty() {
        let _ = writeln!(out, "#: {}", entry.references.join(" "));
    }
    if rendered.fuzzy {
        out.push_str("#, fuzzy\n");
    }
    if let Some(context) = &entry.context {
        write_string(out, "msgctxt", context);
    }
    write_string(out, "msgid", &entry.source_text);

    let translation = rendered.translation.unwrap_or_default();
    match &entry.plural {
        Some(plural) => {
            write_string(out, "msgid_plural", plural);
            for slot in 0..nplurals {
                write_string(out, &format!("msgstr[{}]", slot), translation);
            }
        }
        None => write_string(out, "msgstr", translation),
    }
}

/// Write `keyword "value"`, splitting multi-line values the way msgcat does.
fn write_string(out: &mut String, keyword: &str, value: &str) {
    let body = value.strip_suffix('\n').unwrap_or(value);
    if !body.contains('\n') {
        let _ = writeln!(out, "{} \"{}\"", keyword, escape(value));
        return;
    }

    let _ = writeln!(out, "{} \"\"", keyword);
    for line in value.split_inclusive('\n') {
        let _ = writeln!(out, "\"{}\"", escape(line));
    }
}

/// Escape a string for inclusion between PO double quotes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
