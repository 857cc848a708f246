//! String literals found while generating code.
//!
//! The table is append-only: every literal occurrence gets the next label,
//! identical texts included, so the label of an occurrence is known the
//! moment it is visited.
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct StringLabel(pub usize);

#[derive(Debug, Default)]
pub struct StringTable<'code> {
    entries: Vec<&'code str>,
}

impl<'code> StringTable<'code> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new occurrence. Never deduplicates.
    pub fn push(&mut self, text: &'code str) -> StringLabel {
        self.entries.push(text);
        StringLabel(self.entries.len() - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringLabel, &'code str)> + '_ {
        self.entries
            .iter()
            .copied()
            .enumerate()
            .map(|(i, text)| (StringLabel(i), text))
    }
}

/// Quotes `text` for an `.asciz` directive.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for byte in text.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(byte as char),
            // octal escapes keep non-printable and non-ascii bytes intact
            _ => {
                let _ = write!(out, "\\{byte:03o}");
            }
        }
    }
    out.push('"');
    out
}
