//! Durable per-group admission policy.
//!
//! Reads are served from memory. Mutations are applied to a copy of the
//! group's set, written to disk as a full document, and only then made
//! visible, so a failed write leaves the in-memory policy untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::database::json_store::{JsonFile, Loaded};
use crate::database::models::{PolicyDocument, PolicySet};
use crate::error::PolicyError;

/// Policy of a group that has never been configured.
static EMPTY_POLICY: PolicySet = PolicySet::new();

/// Store for every group's [`PolicySet`].
pub struct PolicyStore {
    file: JsonFile,
    groups: RwLock<BTreeMap<String, PolicySet>>,
    /// Serialises document writes so no commit can overwrite another.
    write_lock: Mutex<()>,
}

impl PolicyStore {
    /// Load the store from `path`.
    ///
    /// Never fails: a missing file is created empty, a malformed one is
    /// moved aside and replaced with an empty document.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let file = JsonFile::new(path);

        let (groups, persist) = match file.load::<PolicyDocument>() {
            Loaded::Parsed(doc) => {
                let groups = doc.into_groups();
                info!(
                    path = %file.path().display(),
                    groups = groups.len(),
                    "Policy state loaded"
                );
                (groups, false)
            }
            Loaded::Missing => {
                info!(path = %file.path().display(), "No policy state yet, starting empty");
                (BTreeMap::new(), true)
            }
            Loaded::Malformed(e) => {
                warn!(path = %file.path().display(), "Policy state is malformed, starting empty: {}", e);
                match file.quarantine() {
                    Ok(moved) => warn!(path = %moved.display(), "Malformed policy state kept aside"),
                    Err(e) => warn!("Failed to move malformed policy state aside: {}", e),
                }
                (BTreeMap::new(), true)
            }
            Loaded::Unreadable(e) => {
                // Nothing is written here; the next mutation surfaces the
                // problem to whoever made it.
                error!(path = %file.path().display(), "Policy state unreadable, starting empty: {}", e);
                (BTreeMap::new(), false)
            }
        };

        let store = Self {
            file,
            groups: RwLock::new(groups),
            write_lock: Mutex::new(()),
        };

        if persist && let Err(e) = store.save() {
            error!("Failed to persist initial policy state: {}", e);
        }

        store
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Write the full current state to disk.
    pub fn save(&self) -> Result<(), PolicyError> {
        let _write = self.write_lock.lock();
        let groups = self.groups.read();
        self.file.save(&PolicyDocument::from_groups(
            groups.iter().map(|(g, s)| (g.as_str(), s)),
        ))
    }

    /// Run `f` against a group's current policy.
    pub fn read<R>(&self, group: &str, f: impl FnOnce(&PolicySet) -> R) -> R {
        let groups = self.groups.read();
        f(groups.get(group).unwrap_or(&EMPTY_POLICY))
    }

    /// Copy of a group's current policy.
    #[cfg(test)]
    pub fn snapshot(&self, group: &str) -> PolicySet {
        self.read(group, PolicySet::clone)
    }

    /// Groups that have a policy entry.
    pub fn groups(&self) -> Vec<String> {
        self.groups.read().keys().cloned().collect()
    }

    /// Apply `f` to a group's policy and persist the result.
    ///
    /// The change becomes visible only after the document is on disk. On
    /// error nothing changed.
    pub fn mutate<R>(
        &self,
        group: &str,
        f: impl FnOnce(&mut PolicySet) -> R,
    ) -> Result<R, PolicyError> {
        let _write = self.write_lock.lock();

        let mut updated = match self.groups.read().get(group) {
            Some(existing) => existing.clone(),
            None => PolicySet::new(),
        };
        let result = f(&mut updated);

        let document = {
            let groups = self.groups.read();
            PolicyDocument::from_groups(
                groups
                    .iter()
                    .filter(|(g, _)| g.as_str() != group)
                    .map(|(g, s)| (g.as_str(), s))
                    .chain(std::iter::once((group, &updated))),
            )
        };
        self.file.save(&document)?;

        self.groups.write().insert(group.to_string(), updated);
        Ok(result)
    }
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("path", &self.file.path())
            .field("groups", &self.groups.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::database::models::PolicyList;

    #[test]
    fn test_bootstrap_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group_join_data.json");

        let store = PolicyStore::load(&path);
        assert!(path.exists());
        assert!(store.groups().is_empty());
        assert!(store.snapshot("g").is_empty());

        let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"acceptKeywords": {}, "rejectKeywords": {}, "rejectUserIds": {}})
        );
    }

    #[test]
    fn test_mutations_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");

        let store = PolicyStore::load(&path);
        store
            .mutate("g1", |set| set.add(PolicyList::AcceptKeywords, &["abc", "ABC", "xyz"]))
            .unwrap();
        store
            .mutate("g1", |set| set.add(PolicyList::RejectUserIds, &["100"]))
            .unwrap();
        store
            .mutate("g2", |set| set.add(PolicyList::RejectKeywords, &["ads"]))
            .unwrap();

        let reloaded = PolicyStore::load(&path);
        let g1 = reloaded.snapshot("g1");
        assert_eq!(g1.entries(PolicyList::AcceptKeywords), vec!["abc", "xyz"]);
        assert!(g1.accept_keywords.matches("it contains ABC"));
        assert!(g1.is_blacklisted("100"));
        assert_eq!(reloaded.snapshot("g2").entries(PolicyList::RejectKeywords), vec!["ads"]);
        assert_eq!(reloaded.snapshot("g1"), store.snapshot("g1"));
    }

    #[test]
    fn test_malformed_state_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        fs::write(&path, b"[1, 2").unwrap();

        let store = PolicyStore::load(&path);
        assert!(store.groups().is_empty());
        assert!(dir.path().join("policy.json.corrupt").exists());

        // Re-persisted as a valid empty document.
        let doc: PolicyDocument = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc, PolicyDocument::default());
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let store = PolicyStore::load(blocker.join("policy.json"));
        let result = store.mutate("g", |set| set.add(PolicyList::RejectUserIds, &["1"]));

        assert!(matches!(result, Err(PolicyError::Write { .. })));
        assert!(!store.snapshot("g").is_blacklisted("1"));
        assert!(store.groups().is_empty());
    }

    #[test]
    fn test_concurrent_mutations_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        let store = Arc::new(PolicyStore::load(&path));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let group = if i % 2 == 0 { "even" } else { "odd" };
                    for j in 0..10 {
                        let keyword = format!("kw-{i}-{j}");
                        store
                            .mutate(group, |set| set.add(PolicyList::RejectKeywords, &[keyword]))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reloaded = PolicyStore::load(&path);
        assert_eq!(reloaded.snapshot("even").reject_keywords.len(), 40);
        assert_eq!(reloaded.snapshot("odd").reject_keywords.len(), 40);
    }
}
