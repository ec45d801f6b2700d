//! Template extraction from PHP sources.
//!
//! Finds WordPress gettext calls (`__`, `_e`, `_x`, `_n`, `_nx` and the
//! `esc_html_*`/`esc_attr_*` variants), collects their string-literal
//! arguments and builds a `.pot` template. Only literal arguments count: a
//! text domain held in a variable is ignored.

use crate::catalog::po::{self, RenderedEntry};
use crate::catalog::Template;
use crate::error::CatalogError;
use crate::model::MessageEntry;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Directories never descended into.
const EXCLUDED_DIRS: &[&str] = &[".git", "vendor", "node_modules", "__pycache__", "build", "dist"];

/// Bytes of each file searched for the plugin header.
const PLUGIN_HEADER_SCAN: usize = 20_000;

pub const UNKNOWN_PLUGIN: &str = "Unknown Plugin";

static GETTEXT_CALL_REGEX: OnceLock<Regex> = OnceLock::new();
static PLUGIN_HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

/// One gettext call found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GettextCall {
    pub function: String,
    pub msgid: String,
    pub plural: Option<String>,
    pub context: Option<String>,
    /// 1-based line of the function name
    pub line: usize,
}

/// Find every gettext call in PHP source text.
pub fn extract_calls(content: &str) -> Vec<GettextCall> {
    let regex = GETTEXT_CALL_REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)\b(__|_e|_x|_ex|_n|_nx|esc_html__|esc_html_e|esc_html_x|esc_attr__|esc_attr_e|esc_attr_x)\s*\(",
        )
        .unwrap()
    });

    regex
        .captures_iter(content)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let function = cap.get(1)?.as_str().to_lowercase();
            let body = call_body(&content[whole.end()..]);
            let literals = string_literals(body);

            let msgid = literals.first().cloned().unwrap_or_default();
            let plural = match function.as_str() {
                "_n" | "_nx" => literals.get(1).cloned(),
                _ => None,
            };
            // The count argument of _nx is normally a variable, so the
            // context is the third literal rather than the fourth argument
            let context = match function.as_str() {
                "_x" | "_ex" | "esc_html_x" | "esc_attr_x" => literals.get(1).cloned(),
                "_nx" => literals.get(2).cloned(),
                _ => None,
            };

            Some(GettextCall {
                function,
                msgid,
                plural: plural.filter(|p| !p.is_empty()),
                context: context.filter(|c| !c.is_empty()),
                line: line_of(content, whole.start()),
            })
        })
        .collect()
}

/// Slice up to the parenthesis closing a call whose `(` was just consumed.
/// Parentheses inside string literals do not count.
fn call_body(rest: &str) -> &str {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in rest.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return &rest[..idx];
                }
            }
            _ => {}
        }
    }
    rest
}

/// Collect single- and double-quoted literals, normalized.
fn string_literals(body: &str) -> Vec<String> {
    let mut literals = Vec::new();
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\'' && c != '"' {
            continue;
        }
        let quote = c;
        let mut raw = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            if c == '\\' {
                raw.push(c);
                if let Some(next) = chars.next() {
                    raw.push(next);
                }
            } else if c == quote {
                closed = true;
                break;
            } else {
                raw.push(c);
            }
        }
        if closed {
            literals.push(normalize_literal(&raw));
        }
    }
    literals
}

/// Resolve `\'`, `\"` and `\\`, drop raw line breaks and trim.
fn normalize_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next @ ('\'' | '"' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '\r' | '\n' => {}
            other => out.push(other),
        }
    }
    out.trim().to_string()
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

/// All `.php` files under `root`, in a stable order.
pub fn find_php_files(root: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !EXCLUDED_DIRS
                    .iter()
                    .any(|dir| entry.file_name().to_string_lossy().eq_ignore_ascii_case(dir))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let is_php = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("php"));
        if entry.file_type().is_file() && is_php {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Read the `Plugin Name:` header from the first file that has one.
pub fn find_plugin_name(files: &[PathBuf]) -> String {
    files
        .iter()
        .filter_map(|path| std::fs::read(path).ok())
        .find_map(|bytes| {
            let head = &bytes[..bytes.len().min(PLUGIN_HEADER_SCAN)];
            plugin_name_in(&String::from_utf8_lossy(head))
        })
        .unwrap_or_else(|| UNKNOWN_PLUGIN.to_string())
}

fn plugin_name_in(text: &str) -> Option<String> {
    let regex = PLUGIN_HEADER_REGEX.get_or_init(|| {
        Regex::new(r"(?im)^[\s*/#@-]*Plugin\s+Name\s*:\s*(.+?)\s*$").unwrap()
    });
    regex
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

type EntryKey = (Option<String>, String, Option<String>);

/// Accumulates calls across files, deduplicated by (context, msgid, plural).
#[derive(Debug)]
pub struct PotBuilder {
    root: PathBuf,
    keys: HashMap<EntryKey, usize>,
    entries: Vec<MessageEntry>,
    files_scanned: usize,
    total_strings: usize,
}

impl PotBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keys: HashMap::new(),
            entries: Vec::new(),
            files_scanned: 0,
            total_strings: 0,
        }
    }

    /// Scan one file. Unreadable files are skipped with a warning.
    pub fn scan_file(&mut self, path: &Path) {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                return;
            }
        };
        let relative = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        self.add_source(&relative, &String::from_utf8_lossy(&bytes));
    }

    /// Add the calls of one source text; returns how many were kept.
    pub fn add_source(&mut self, relative_path: &str, content: &str) -> usize {
        self.files_scanned += 1;
        let mut kept = 0;

        for call in extract_calls(content) {
            if call.msgid.is_empty() {
                continue;
            }
            kept += 1;
            self.total_strings += 1;

            let reference = format!("{}:{}", relative_path, call.line);
            let key = (call.context.clone(), call.msgid.clone(), call.plural.clone());
            match self.keys.get(&key) {
                Some(&idx) => self.entries[idx].references.push(reference),
                None => {
                    self.keys.insert(key, self.entries.len());
                    self.entries.push(
                        MessageEntry::new(call.msgid, call.context, call.plural)
                            .with_references(vec![reference]),
                    );
                }
            }
        }
        kept
    }

    pub fn finish(self, plugin_name: impl Into<String>) -> Extraction {
        let mut entries = self.entries;
        entries.sort_by_cached_key(|entry| entry.source_text.to_lowercase());
        Extraction {
            plugin_name: plugin_name.into(),
            files_scanned: self.files_scanned,
            total_strings: self.total_strings,
            entries,
        }
    }
}

/// Result of scanning a source tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub plugin_name: String,
    pub files_scanned: usize,
    /// Every kept call, duplicates included
    pub total_strings: usize,
    /// Unique entries sorted case-insensitively by msgid
    pub entries: Vec<MessageEntry>,
}

impl Extraction {
    /// Walk `root` and extract every PHP file under it.
    pub fn scan(root: &Path) -> Result<Self> {
        let files = find_php_files(root)?;
        let plugin_name = find_plugin_name(&files);
        let mut builder = PotBuilder::new(root);
        for file in &files {
            builder.scan_file(file);
        }
        Ok(builder.finish(plugin_name))
    }

    pub fn unique_strings(&self) -> usize {
        self.entries.len()
    }

    /// The msgids referenced most often, most frequent first.
    pub fn duplicates(&self, limit: usize) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .entries
            .iter()
            .filter(|entry| entry.references.len() > 1)
            .map(|entry| (entry.source_text.clone(), entry.references.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(limit);
        counts
    }

    /// Standard WordPress POT header.
    pub fn metadata(&self, creation_date: &str) -> Vec<(String, String)> {
        [
            ("Project-Id-Version", self.plugin_name.as_str()),
            ("Report-Msgid-Bugs-To", self.plugin_name.as_str()),
            ("POT-Creation-Date", creation_date),
            ("PO-Revision-Date", creation_date),
            ("Last-Translator", ""),
            ("Language-Team", ""),
            ("MIME-Version", "1.0"),
            ("Content-Type", "text/plain; charset=UTF-8"),
            ("Content-Transfer-Encoding", "8bit"),
            ("Plural-Forms", "nplurals=2; plural=(n != 1);"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    pub fn to_template(&self, base_name: &str, creation_date: &str) -> Template {
        Template::new(base_name, self.metadata(creation_date), self.entries.clone())
    }

    /// Render the POT text.
    pub fn render(&self, creation_date: &str) -> String {
        let rendered: Vec<RenderedEntry> = self
            .entries
            .iter()
            .map(|entry| RenderedEntry {
                entry,
                translation: None,
                fuzzy: false,
            })
            .collect();
        po::render(&self.metadata(creation_date), &rendered, 2)
    }

    pub fn write(&self, path: &Path, creation_date: &str) -> Result<(), CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }
        std::fs::write(path, self.render(creation_date)).map_err(|e| CatalogError::io(path, e))
    }

    pub fn log_summary(&self, output: &Path) {
        info!("Extraction summary:");
        info!("  Files scanned: {}", self.files_scanned);
        info!("  Total strings found: {}", self.total_strings);
        info!("  Unique msgids: {}", self.unique_strings());
        info!("  Plugin name: {}", self.plugin_name);
        info!("  Output file: {}", output.display());

        let duplicates = self.duplicates(10);
        if duplicates.is_empty() {
            info!("No duplicate strings found");
            return;
        }
        info!("Most repeated strings:");
        for (msgid, count) in duplicates {
            let short = if msgid.chars().count() > 40 {
                format!("{}...", msgid.chars().take(37).collect::<String>())
            } else {
                msgid
            };
            info!("  {:40} {}", short, count);
        }
    }
}
