//! Gettext template reader.
//!
//! Parses `.pot` (or `.po`) text into header metadata and an ordered list of
//! `MessageEntry` values. Translations already present in the file are
//! ignored: a template is only a source of msgids.

use crate::error::CatalogError;
use crate::model::MessageEntry;
use std::path::Path;

/// A parsed template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    /// File name without extension; output catalogs are named after it
    pub base_name: String,
    /// Header fields in file order
    pub metadata: Vec<(String, String)>,
    pub entries: Vec<MessageEntry>,
}

impl Template {
    pub fn new(
        base_name: impl Into<String>,
        metadata: Vec<(String, String)>,
        entries: Vec<MessageEntry>,
    ) -> Self {
        Self {
            base_name: base_name.into(),
            metadata,
            entries,
        }
    }

    /// Read and parse a template file.
    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "messages".to_string());
        Self::parse(&text, &path.display().to_string(), base_name)
    }

    /// Parse template text. `origin` is only used in error messages.
    pub fn parse(
        text: &str,
        origin: &str,
        base_name: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let mut parser = Parser {
            origin,
            metadata: Vec::new(),
            entries: Vec::new(),
            pending: PendingEntry::default(),
            current: Field::None,
        };

        for (idx, raw) in text.lines().enumerate() {
            parser.line(idx + 1, raw.trim())?;
        }
        parser.flush();

        Ok(Self {
            base_name: base_name.into(),
            metadata: parser.metadata,
            entries: parser.entries,
        })
    }

    /// Look up a header field (case-insensitive key).
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Number of plural slots declared by `Plural-Forms`, defaulting to 2.
    pub fn nplurals(&self) -> usize {
        self.metadata_value("Plural-Forms")
            .and_then(|forms| {
                forms.split(';').find_map(|part| {
                    let (key, value) = part.split_once('=')?;
                    if key.trim() == "nplurals" {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
            })
            .filter(|n| *n > 0)
            .unwrap_or(2)
    }
}

/// Which string a continuation line extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Context,
    Id,
    Plural,
    Str,
}

#[derive(Debug, Default)]
struct PendingEntry {
    context: Option<String>,
    id: Option<String>,
    plural: Option<String>,
    /// Only the first msgstr matters, and only for the header
    first_str: Option<String>,
    references: Vec<String>,
    seen_str: bool,
}

struct Parser<'a> {
    origin: &'a str,
    metadata: Vec<(String, String)>,
    entries: Vec<MessageEntry>,
    pending: PendingEntry,
    current: Field,
}

impl Parser<'_> {
    fn line(&mut self, line_no: usize, line: &str) -> Result<(), CatalogError> {
        if line.is_empty() {
            self.flush();
            return Ok(());
        }

        if let Some(comment) = line.strip_prefix('#') {
            // Obsolete entries are dropped entirely
            if comment.starts_with('~') {
                return Ok(());
            }
            if self.pending.seen_str {
                self.flush();
            }
            if let Some(refs) = comment.strip_prefix(':') {
                self.pending
                    .references
                    .extend(refs.split_whitespace().map(str::to_string));
            }
            return Ok(());
        }

        if line.starts_with('"') {
            let value = unquote(line, self.origin, line_no)?;
            return self.append(line_no, &value);
        }

        let (keyword, rest) = line.split_once(char::is_whitespace).ok_or_else(|| {
            self.error(line_no, format!("expected a keyword and a string: {}", line))
        })?;
        let value = unquote(rest.trim(), self.origin, line_no)?;

        match keyword {
            "msgctxt" => {
                if self.pending.seen_str || self.pending.id.is_some() {
                    self.flush();
                }
                self.pending.context = Some(value);
                self.current = Field::Context;
            }
            "msgid" => {
                if self.pending.seen_str || self.pending.id.is_some() {
                    self.flush();
                }
                self.pending.id = Some(value);
                self.current = Field::Id;
            }
            "msgid_plural" => {
                if self.pending.id.is_none() {
                    return Err(self.error(line_no, "msgid_plural without msgid".to_string()));
                }
                self.pending.plural = Some(value);
                self.current = Field::Plural;
            }
            kw if kw == "msgstr" || (kw.starts_with("msgstr[") && kw.ends_with(']')) => {
                if self.pending.id.is_none() {
                    return Err(self.error(line_no, "msgstr without msgid".to_string()));
                }
                if self.pending.seen_str {
                    self.current = Field::None;
                } else {
                    self.pending.first_str = Some(value);
                    self.current = Field::Str;
                }
                self.pending.seen_str = true;
            }
            other => {
                return Err(self.error(line_no, format!("unknown keyword '{}'", other)));
            }
        }
        Ok(())
    }

    /// Continuation line: extend whichever string was opened last.
    fn append(&mut self, line_no: usize, value: &str) -> Result<(), CatalogError> {
        let target = match self.current {
            Field::Context => self.pending.context.as_mut(),
            Field::Id => self.pending.id.as_mut(),
            Field::Plural => self.pending.plural.as_mut(),
            Field::Str => self.pending.first_str.as_mut(),
            Field::None => {
                // Continuation of a later msgstr[n] slot
                if self.pending.seen_str {
                    return Ok(());
                }
                return Err(self.error(line_no, "string without a keyword".to_string()));
            }
        };

        if let Some(s) = target {
            s.push_str(value);
        }
        Ok(())
    }

    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.current = Field::None;

        let Some(id) = pending.id else {
            return;
        };

        if id.is_empty() && pending.context.is_none() {
            if let Some(header) = pending.first_str {
                self.metadata = parse_header(&header);
            }
            return;
        }

        let entry =
            MessageEntry::new(id, pending.context, pending.plural).with_references(pending.references);
        self.entries.push(entry);
    }

    fn error(&self, line: usize, message: String) -> CatalogError {
        CatalogError::Parse {
            origin: self.origin.to_string(),
            line,
            message,
        }
    }
}

/// Split a header msgstr into `Key: Value` pairs.
fn parse_header(header: &str) -> Vec<(String, String)> {
    header
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Strip the quotes from a PO string literal and resolve its escapes.
fn unquote(literal: &str, origin: &str, line: usize) -> Result<String, CatalogError> {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| CatalogError::Parse {
            origin: origin.to_string(),
            line,
            message: format!("unterminated string: {}", literal),
        })?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {
                return Err(CatalogError::Parse {
                    origin: origin.to_string(),
                    line,
                    message: "dangling escape at end of string".to_string(),
                })
            }
        }
    }
    Ok(out)
}
