//! Term dictionary: the read-only ground truth for valid words
//!
//! Entries come from a [`DictionaryProvider`] (the embedded term list or the
//! SQLite store) and are loaded once per session into a [`TermDictionary`].
//! Lookups are O(1) by exact display text.

use crate::error::{GameError, StorageError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Embedded IT vocabulary, one `word<TAB>tier<TAB>description` per line
static TERMS_DATA: &str = include_str!("../../data/terms.tsv");

/// Built-in entries, parsed on first use
static BUILTIN: Lazy<Vec<DictionaryEntry>> = Lazy::new(|| {
    parse_terms(TERMS_DATA).unwrap_or_else(|e| {
        tracing::error!(error = %e, "embedded term list is malformed");
        Vec::new()
    })
});

/// A canonical vocabulary item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub id: i64,
    pub display_text: String,
    /// 1 is easiest
    pub difficulty_tier: u32,
    pub description: Option<String>,
}

impl DictionaryEntry {
    pub fn new(id: i64, display_text: impl Into<String>, difficulty_tier: u32) -> Self {
        Self {
            id,
            display_text: display_text.into(),
            difficulty_tier,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Length in characters, not bytes
    pub fn char_len(&self) -> usize {
        self.display_text.chars().count()
    }
}

/// Optional tier bounds applied by a provider when reading entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub min_tier: Option<u32>,
    pub max_tier: Option<u32>,
}

impl EntryFilter {
    /// Every entry
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tiers(min: u32, max: u32) -> Self {
        Self {
            min_tier: Some(min),
            max_tier: Some(max),
        }
    }

    pub fn matches(&self, entry: &DictionaryEntry) -> bool {
        self.min_tier.is_none_or(|min| entry.difficulty_tier >= min)
            && self.max_tier.is_none_or(|max| entry.difficulty_tier <= max)
    }
}

/// Source of dictionary entries (bulk or filtered read).
pub trait DictionaryProvider {
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<DictionaryEntry>, StorageError>;
}

/// The term list compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTerms;

impl DictionaryProvider for BuiltinTerms {
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<DictionaryEntry>, StorageError> {
        Ok(BUILTIN.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}

/// Entries held directly in memory (tests, or terms merged by a host).
impl DictionaryProvider for Vec<DictionaryEntry> {
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<DictionaryEntry>, StorageError> {
        Ok(self.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}

/// Parse a tab-separated term list.
///
/// Blank lines and lines starting with `#` are skipped. The description column
/// is optional. Ids are assigned from 1 in file order.
pub fn parse_terms(data: &str) -> Result<Vec<DictionaryEntry>, StorageError> {
    let mut entries = Vec::new();

    for (idx, raw) in data.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let mut cols = line.split('\t');
        let word = cols.next().map(str::trim).unwrap_or_default();
        if word.is_empty() {
            return Err(StorageError::InvalidTerm {
                line: idx + 1,
                reason: "missing word".to_string(),
            });
        }

        let tier = cols
            .next()
            .map(str::trim)
            .ok_or_else(|| StorageError::InvalidTerm {
                line: idx + 1,
                reason: "missing tier".to_string(),
            })?
            .parse::<u32>()
            .map_err(|e| StorageError::InvalidTerm {
                line: idx + 1,
                reason: format!("bad tier: {}", e),
            })?;
        if tier == 0 {
            return Err(StorageError::InvalidTerm {
                line: idx + 1,
                reason: "tier must be at least 1".to_string(),
            });
        }

        let description = cols
            .next()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        entries.push(DictionaryEntry {
            id: entries.len() as i64 + 1,
            display_text: word.to_string(),
            difficulty_tier: tier,
            description,
        });
    }

    Ok(entries)
}

/// In-memory, read-only dictionary for one session.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    entries: Vec<DictionaryEntry>,
    /// display_text -> index into `entries`
    by_text: HashMap<String, usize>,
}

impl TermDictionary {
    /// Load every entry from a provider. This is the one-time acquisition a
    /// session needs before it can generate turns.
    pub fn load(provider: &dyn DictionaryProvider) -> Result<Self, GameError> {
        let entries = provider.entries(&EntryFilter::all())?;
        let dictionary = Self::from_entries(entries);
        tracing::info!(entries = dictionary.len(), "dictionary loaded");
        Ok(dictionary)
    }

    /// Build from raw entries. Entries with empty text or tier 0 are dropped,
    /// and so is any entry repeating an earlier entry's display text.
    pub fn from_entries(entries: Vec<DictionaryEntry>) -> Self {
        let mut kept = Vec::with_capacity(entries.len());
        let mut by_text = HashMap::new();

        for entry in entries {
            if entry.display_text.trim().is_empty() || entry.difficulty_tier == 0 {
                tracing::warn!(id = entry.id, "skipping malformed dictionary entry");
                continue;
            }
            if by_text.contains_key(&entry.display_text) {
                tracing::debug!(id = entry.id, text = %entry.display_text, "dropping duplicate display text");
                continue;
            }
            by_text.insert(entry.display_text.clone(), kept.len());
            kept.push(entry);
        }

        Self {
            entries: kept,
            by_text,
        }
    }

    /// Exact, case-sensitive lookup by display text
    pub fn lookup(&self, text: &str) -> Option<&DictionaryEntry> {
        self.by_text.get(text).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, text: &str) -> bool {
        self.by_text.contains_key(text)
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    /// Entries whose tier lies in `min..=max`
    pub fn entries_in_tiers(&self, min: u32, max: u32) -> impl Iterator<Item = &DictionaryEntry> {
        self.entries
            .iter()
            .filter(move |e| (min..=max).contains(&e.difficulty_tier))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_terms_parse() {
        let entries = BuiltinTerms.entries(&EntryFilter::all()).unwrap();
        assert!(entries.len() > 80, "Expected 80+ terms, got {}", entries.len());
        assert!(entries.iter().all(|e| e.difficulty_tier >= 1));
        assert!(entries.iter().any(|e| e.display_text == "git"));
    }

    #[test]
    fn test_builtin_has_typing_candidates() {
        let dict = TermDictionary::load(&BuiltinTerms).unwrap();
        assert!(dict.entries_in_tiers(1, 7).count() > 50);
        assert!(dict.entries().iter().any(|e| e.difficulty_tier > 7));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let dict = TermDictionary::from_entries(vec![DictionaryEntry::new(1, "api", 1)]);
        assert!(dict.lookup("api").is_some());
        assert!(dict.lookup("Api").is_none());
        assert!(dict.lookup("apis").is_none());
    }

    #[test]
    fn test_duplicate_text_first_wins() {
        let dict = TermDictionary::from_entries(vec![
            DictionaryEntry::new(1, "git", 9),
            DictionaryEntry::new(2, "git", 3),
        ]);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.lookup("git").unwrap().id, 1);
        // the dropped copy cannot surface through tier filtering either
        assert_eq!(dict.entries_in_tiers(1, 7).count(), 0);
    }

    #[test]
    fn test_malformed_entries_dropped() {
        let dict = TermDictionary::from_entries(vec![
            DictionaryEntry::new(1, "  ", 2),
            DictionaryEntry::new(2, "tcp", 0),
            DictionaryEntry::new(3, "udp", 2),
        ]);
        assert_eq!(dict.len(), 1);
        assert!(dict.contains("udp"));
    }

    #[test]
    fn test_entries_in_tiers() {
        let dict = TermDictionary::from_entries(vec![
            DictionaryEntry::new(1, "git", 2),
            DictionaryEntry::new(2, "kubernetes", 7),
            DictionaryEntry::new(3, "cryptography", 9),
        ]);
        let words: Vec<_> = dict.entries_in_tiers(1, 7).map(|e| e.display_text.as_str()).collect();
        assert_eq!(words, vec!["git", "kubernetes"]);
    }

    #[test]
    fn test_filter() {
        let entries = vec![
            DictionaryEntry::new(1, "git", 2),
            DictionaryEntry::new(2, "sql", 3),
            DictionaryEntry::new(3, "hypervisor", 8),
        ];
        let low = entries.entries(&EntryFilter::tiers(1, 2)).unwrap();
        assert_eq!(low.len(), 1);
        let high = entries
            .entries(&EntryFilter {
                min_tier: Some(3),
                max_tier: None,
            })
            .unwrap();
        assert_eq!(high.len(), 2);
    }

    #[test]
    fn test_parse_terms() {
        let data = "# comment\n\nrust\t4\tSystems language\ncargo\t3\n";
        let entries = parse_terms(data).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[0].description.as_deref(), Some("Systems language"));
        assert_eq!(entries[1].display_text, "cargo");
        assert_eq!(entries[1].description, None);
    }

    #[test]
    fn test_parse_terms_rejects_bad_tier() {
        let err = parse_terms("rust\tfour\n").unwrap_err();
        assert!(matches!(err, StorageError::InvalidTerm { line: 1, .. }));

        let err = parse_terms("ok\t1\nrust\t0\n").unwrap_err();
        assert!(matches!(err, StorageError::InvalidTerm { line: 2, .. }));

        let err = parse_terms("rust\n").unwrap_err();
        assert!(matches!(err, StorageError::InvalidTerm { line: 1, .. }));
    }
}
