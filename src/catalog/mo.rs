//! Binary `.mo` catalog compiler.
//!
//! Layout (all integers little-endian u32):
//!
//! | offset | field                                  |
//! |--------|----------------------------------------|
//! | 0      | magic `0x950412de`                     |
//! | 4      | revision (0)                           |
//! | 8      | number of strings N                    |
//! | 12     | offset of original-strings table       |
//! | 16     | offset of translated-strings table     |
//! | 20     | hash table size (0, no hash table)     |
//! | 24     | hash table offset                      |
//!
//! Each table holds N `(length, offset)` pairs; the string data follows,
//! NUL-terminated. Keys are sorted so readers can binary search.

use crate::model::CONTEXT_SEPARATOR;

const MAGIC: u32 = 0x950412de;
const HEADER_LEN: usize = 28;

/// One key/value pair as it appears in the compiled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoMessage {
    /// `msgctxt \u{4} msgid [\0 msgid_plural]`
    pub key: String,
    /// Translation; plural forms joined by `\0`
    pub value: String,
}

impl MoMessage {
    pub fn new(
        context: Option<&str>,
        msgid: &str,
        plural: Option<&str>,
        translations: &[&str],
    ) -> Self {
        let mut key = String::new();
        if let Some(context) = context {
            key.push_str(context);
            key.push(CONTEXT_SEPARATOR);
        }
        key.push_str(msgid);
        if let Some(plural) = plural {
            key.push('\0');
            key.push_str(plural);
        }

        Self {
            key,
            value: translations.join("\0"),
        }
    }
}

/// Compile messages plus the header text into `.mo` bytes.
///
/// Messages without any translated text are left out, as msgfmt does.
pub fn compile(header: &str, messages: &[MoMessage]) -> Vec<u8> {
    let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(messages.len() + 1);
    pairs.push(("", header));
    pairs.extend(
        messages
            .iter()
            .filter(|m| !m.key.is_empty() && !m.value.chars().all(|c| c == '\0'))
            .map(|m| (m.key.as_str(), m.value.as_str())),
    );
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    pairs.dedup_by(|a, b| a.0 == b.0);

    let count = pairs.len();
    let originals_offset = HEADER_LEN;
    let translations_offset = originals_offset + count * 8;
    let data_offset = translations_offset + count * 8;

    let mut originals_table = Vec::with_capacity(count * 8);
    let mut translations_table = Vec::with_capacity(count * 8);
    let mut data = Vec::new();

    for (key, _) in &pairs {
        push_u32(&mut originals_table, key.len());
        push_u32(&mut originals_table, data_offset + data.len());
        data.extend_from_slice(key.as_bytes());
        data.push(0);
    }
    for (_, value) in &pairs {
        push_u32(&mut translations_table, value.len());
        push_u32(&mut translations_table, data_offset + data.len());
        data.extend_from_slice(value.as_bytes());
        data.push(0);
    }

    let mut out = Vec::with_capacity(data_offset + data.len());
    out.extend_from_slice(&MAGIC.to_le_bytes());
    push_u32(&mut out, 0);
    push_u32(&mut out, count);
    push_u32(&mut out, originals_offset);
    push_u32(&mut out, translations_offset);
    push_u32(&mut out, 0);
    push_u32(&mut out, data_offset);
    out.extend_from_slice(&originals_table);
    out.extend_from_slice(&translations_table);
    out.extend_from_slice(&data);
    out
}

fn push_u32(buf: &mut Vec<u8>, value: usize) {
    buf.extend_from_slice(&(value as u32).to_le_bytes());
}

#[cfg(test)]
pub(crate) mod reader {
    //! Minimal `.mo` reader for checking compiled output.

    fn u32_at(bytes: &[u8], offset: usize) -> usize {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[offset..offset + 4]);
        u32::from_le_bytes(buf) as usize
    }

    fn string_at(bytes: &[u8], table: usize, index: usize) -> String {
        let len = u32_at(bytes, table + index * 8);
        let offset = u32_at(bytes, table + index * 8 + 4);
        assert_eq!(bytes[offset + len], 0, "strings are NUL-terminated");
        String::from_utf8(bytes[offset..offset + len].to_vec()).unwrap()
    }

    /// Decode every (key, value) pair in file order.
    pub fn read(bytes: &[u8]) -> Vec<(String, String)> {
        assert_eq!(u32_at(bytes, 0), super::MAGIC as usize);
        let count = u32_at(bytes, 8);
        let originals = u32_at(bytes, 12);
        let translations = u32_at(bytes, 16);
        (0..count)
            .map(|i| (string_at(bytes, originals, i), string_at(bytes, translations, i)))
            .collect()
    }
}
