//! `@"Item Name"` reference extraction.
//!
//! Item names may contain spaces and punctuation, so they cannot appear in an
//! expression as plain identifiers. Before lexing, every quoted reference is
//! rewritten to a synthetic identifier and the mapping back to the item name
//! is recorded in a [`ReferenceTable`].

use std::collections::{BTreeMap, HashMap};

use crate::models::StatKind;

const HANGUL_SYLLABLES: std::ops::RangeInclusive<char> = '\u{AC00}'..='\u{D7A3}';

/// Characters that survive into a synthetic identifier unchanged.
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || HANGUL_SYLLABLES.contains(&c)
}

/// Derive the base synthetic identifier for an item name.
///
/// Every character outside `[A-Za-z0-9]` and the Hangul syllable block
/// becomes `_`. A leading digit is prefixed with `_` so the result always
/// lexes as an identifier.
pub fn synthetic_name(item_name: &str) -> String {
    let mut out: String = item_name
        .chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

// ---------------------------------------------------------------------------
// ReferenceTable
// ---------------------------------------------------------------------------

/// Injective mapping between synthetic identifiers and item names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    by_synthetic: BTreeMap<String, String>,
    by_item: HashMap<String, String>,
}

impl ReferenceTable {
    /// Return the synthetic identifier for `item_name`, assigning one if the
    /// item has not been seen yet.
    ///
    /// Two item names that sanitize to the same identifier, or a name that
    /// sanitizes to a built-in statistic, get a `__N` suffix.
    fn assign(&mut self, item_name: &str) -> String {
        if let Some(existing) = self.by_item.get(item_name) {
            return existing.clone();
        }

        let base = synthetic_name(item_name);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.by_synthetic.contains_key(&candidate)
            || StatKind::reserved_names().any(|r| r == candidate)
        {
            candidate = format!("{base}__{suffix}");
            suffix += 1;
        }

        self.by_synthetic
            .insert(candidate.clone(), item_name.to_string());
        self.by_item
            .insert(item_name.to_string(), candidate.clone());
        candidate
    }

    /// Item name bound to a synthetic identifier.
    pub fn item_name(&self, synthetic: &str) -> Option<&str> {
        self.by_synthetic.get(synthetic).map(String::as_str)
    }

    /// Synthetic identifier assigned to an item name.
    pub fn synthetic_for(&self, item_name: &str) -> Option<&str> {
        self.by_item.get(item_name).map(String::as_str)
    }

    /// `(synthetic, item_name)` pairs ordered by synthetic identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_synthetic
            .iter()
            .map(|(s, i)| (s.as_str(), i.as_str()))
    }

    /// Distinct item names, one per reference entry.
    pub fn item_names(&self) -> impl Iterator<Item = &str> {
        self.by_synthetic.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_synthetic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_synthetic.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Rewriting
// ---------------------------------------------------------------------------

/// Source text with references replaced, plus the table describing them.
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub expression: String,
    pub references: ReferenceTable,
}

/// Replace every `@"<name>"` with its synthetic identifier.
///
/// The name must be non-empty and may not contain a newline; an `@` that does
/// not start a well-formed reference is left in place (and will later fail
/// to lex).
pub fn rewrite(source: &str) -> Rewritten {
    let mut references = ReferenceTable::default();
    let mut expression = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(at) = rest.find("@\"") {
        expression.push_str(&rest[..at]);
        let after_quote = &rest[at + 2..];

        match quoted_name(after_quote) {
            Some(name) => {
                expression.push_str(&references.assign(name));
                rest = &after_quote[name.len() + 1..];
            }
            None => {
                expression.push('@');
                rest = &rest[at + 1..];
            }
        }
    }
    expression.push_str(rest);

    Rewritten {
        expression,
        references,
    }
}

/// Extract only the reference table from `source`.
pub fn extract(source: &str) -> ReferenceTable {
    rewrite(source).references
}

/// The text up to the next `"` on the same line, if non-empty.
fn quoted_name(text: &str) -> Option<&str> {
    let end = text.find(['"', '\n'])?;
    if end == 0 || text.as_bytes()[end] != b'"' {
        return None;
    }
    Some(&text[..end])
}
