//! Per-group admission policy and its persisted layout.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Keywords matched case-insensitively as substrings.
///
/// Entries are unique ignoring case; the first spelling inserted is kept
/// for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet {
    /// Lowercased keyword -> display spelling
    entries: BTreeMap<String, String>,
}

impl KeywordSet {
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert a keyword. Returns `false` for blanks and for keywords that
    /// are already present in any casing.
    pub fn insert(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return false;
        }

        let key = keyword.to_lowercase();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, keyword.to_string());
        true
    }

    /// Remove a keyword in any casing. Returns `false` if it was absent.
    pub fn remove(&mut self, keyword: &str) -> bool {
        self.entries
            .remove(&keyword.trim().to_lowercase())
            .is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Display spellings in stable order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// First keyword contained in already-lowercased text.
    pub fn find_in_lowercase(&self, lowered: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| lowered.contains(key.as_str()))
            .map(|(_, display)| display.as_str())
    }

    /// Whether any keyword occurs in `text`, ignoring case.
    pub fn matches(&self, text: &str) -> bool {
        self.find_in_lowercase(&text.to_lowercase()).is_some()
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        let mut set = Self::new();
        for keyword in &keywords {
            set.insert(keyword);
        }
        set
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.entries.into_values().collect()
    }
}

/// Which list of a [`PolicySet`] an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyList {
    /// Keywords that let a join request through.
    AcceptKeywords,
    /// Keywords that reject a join request.
    RejectKeywords,
    /// User ids that are always rejected.
    RejectUserIds,
}

impl fmt::Display for PolicyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AcceptKeywords => "accept keywords",
            Self::RejectKeywords => "reject keywords",
            Self::RejectUserIds => "blacklisted ids",
        })
    }
}

/// Admission rules of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet {
    pub accept_keywords: KeywordSet,
    pub reject_keywords: KeywordSet,
    pub reject_user_ids: BTreeSet<String>,
}

impl PolicySet {
    pub const fn new() -> Self {
        Self {
            accept_keywords: KeywordSet::new(),
            reject_keywords: KeywordSet::new(),
            reject_user_ids: BTreeSet::new(),
        }
    }

    /// Exact match against the id blacklist.
    pub fn is_blacklisted(&self, user_id: &str) -> bool {
        self.reject_user_ids.contains(user_id)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.accept_keywords.is_empty()
            && self.reject_keywords.is_empty()
            && self.reject_user_ids.is_empty()
    }

    /// Entries of one list, in stable order.
    pub fn entries(&self, list: PolicyList) -> Vec<String> {
        match list {
            PolicyList::AcceptKeywords => self.accept_keywords.iter().map(str::to_string).collect(),
            PolicyList::RejectKeywords => self.reject_keywords.iter().map(str::to_string).collect(),
            PolicyList::RejectUserIds => self.reject_user_ids.iter().cloned().collect(),
        }
    }

    /// Set-union `entries` into a list. Returns the entries that were new.
    pub fn add<S: AsRef<str>>(&mut self, list: PolicyList, entries: &[S]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| match list {
                PolicyList::AcceptKeywords => self.accept_keywords.insert(e),
                PolicyList::RejectKeywords => self.reject_keywords.insert(e),
                PolicyList::RejectUserIds => !e.is_empty() && self.reject_user_ids.insert(e.to_string()),
            })
            .map(str::to_string)
            .collect()
    }

    /// Set-difference `entries` out of a list. Returns the entries that
    /// were present.
    pub fn remove<S: AsRef<str>>(&mut self, list: PolicyList, entries: &[S]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| match list {
                PolicyList::AcceptKeywords => self.accept_keywords.remove(e),
                PolicyList::RejectKeywords => self.reject_keywords.remove(e),
                PolicyList::RejectUserIds => self.reject_user_ids.remove(*e),
            })
            .map(str::to_string)
            .collect()
    }
}

/// On-disk layout: one map per list, keyed by group id.
///
/// Missing maps load as empty. The snake_case names written by older
/// deployments are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    #[serde(default, alias = "accept_keywords")]
    pub accept_keywords: BTreeMap<String, KeywordSet>,

    #[serde(default, alias = "reject_keywords")]
    pub reject_keywords: BTreeMap<String, KeywordSet>,

    #[serde(default, alias = "reject_ids")]
    pub reject_user_ids: BTreeMap<String, BTreeSet<String>>,
}

impl PolicyDocument {
    /// Build the document from per-group sets. Empty lists are omitted.
    pub fn from_groups<'a, I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a PolicySet)>,
    {
        let mut doc = Self::default();
        for (group, set) in groups {
            if !set.accept_keywords.is_empty() {
                doc.accept_keywords
                    .insert(group.to_string(), set.accept_keywords.clone());
            }
            if !set.reject_keywords.is_empty() {
                doc.reject_keywords
                    .insert(group.to_string(), set.reject_keywords.clone());
            }
            if !set.reject_user_ids.is_empty() {
                doc.reject_user_ids
                    .insert(group.to_string(), set.reject_user_ids.clone());
            }
        }
        doc
    }

    /// Split the document back into per-group sets.
    pub fn into_groups(self) -> BTreeMap<String, PolicySet> {
        let mut groups: BTreeMap<String, PolicySet> = BTreeMap::new();

        for (group, keywords) in self.accept_keywords {
            groups.entry(group).or_default().accept_keywords = keywords;
        }
        for (group, keywords) in self.reject_keywords {
            groups.entry(group).or_default().reject_keywords = keywords;
        }
        for (group, ids) in self.reject_user_ids {
            // Blank ids never match anyone; drop them on the way in.
            let ids = ids
                .into_iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
            groups.entry(group).or_default().reject_user_ids = ids;
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_set_dedupes_ignoring_case() {
        let set = KeywordSet::from(vec!["abc".to_string(), "ABC".to_string(), "xyz".to_string()]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["abc", "xyz"]);
        assert!(set.matches("this contains ABC somewhere"));
        assert!(!set.matches("nothing here"));
    }

    #[test]
    fn test_keyword_set_ignores_blanks() {
        let mut set = KeywordSet::new();
        assert!(!set.insert("   "));
        assert!(set.insert("  invite code "));
        assert_eq!(set.iter().next(), Some("invite code"));
        assert!(set.remove("INVITE CODE"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_add_and_remove_are_idempotent() {
        let mut set = PolicySet::new();

        assert_eq!(set.add(PolicyList::RejectKeywords, &["spam"]), vec!["spam"]);
        assert!(set.add(PolicyList::RejectKeywords, &["spam"]).is_empty());
        assert_eq!(set.entries(PolicyList::RejectKeywords), vec!["spam"]);

        assert!(set.remove(PolicyList::RejectUserIds, &["42"]).is_empty());
        assert_eq!(set.add(PolicyList::RejectUserIds, &["42", " ", "42"]), vec!["42"]);
        assert!(set.is_blacklisted("42"));
        assert_eq!(set.remove(PolicyList::RejectUserIds, &["42"]), vec!["42"]);
        assert!(set.reject_user_ids.is_empty());
        assert!(!set.is_empty());

        assert_eq!(set.remove(PolicyList::RejectKeywords, &["SPAM"]), vec!["SPAM"]);
        assert!(set.remove(PolicyList::RejectKeywords, &["spam"]).is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_document_uses_camel_case_and_reads_legacy_names() {
        let mut set = PolicySet::new();
        set.add(PolicyList::AcceptKeywords, &["hello"]);
        set.add(PolicyList::RejectUserIds, &["7"]);

        let doc = PolicyDocument::from_groups([("g1", &set)]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["acceptKeywords"]["g1"], serde_json::json!(["hello"]));
        assert_eq!(json["rejectUserIds"]["g1"], serde_json::json!(["7"]));
        assert_eq!(json["rejectKeywords"], serde_json::json!({}));

        let legacy = r#"{"accept_keywords": {"g2": ["a", "A"]}, "reject_ids": {"g2": ["9"]}, "extra": 1}"#;
        let groups = serde_json::from_str::<PolicyDocument>(legacy)
            .unwrap()
            .into_groups();
        let g2 = &groups["g2"];
        assert_eq!(g2.accept_keywords.len(), 1);
        assert!(g2.is_blacklisted("9"));
        assert!(g2.reject_keywords.is_empty());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let doc: PolicyDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(doc, PolicyDocument::default());
    }
}
