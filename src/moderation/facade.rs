//! Entry point the bot layer talks to.
//!
//! Routes join requests to admission, messages to flood detection and the
//! word filter, and funnels every policy change through the store so it is
//! on disk before the caller hears back.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::ModerationSettings;
use crate::database::{PolicyList, PolicyStore};
use crate::error::PolicyError;

use super::admission::{AdmissionEngine, ApproveReason, Decision};
use super::api::JoinRequest;
use super::flood::{FloodDetector, ThrottleDecision};
use super::forbidden::{ForbiddenHit, ForbiddenWordFilter};

/// Moderation core shared by every handler.
#[derive(Debug)]
pub struct AdminFacade {
    store: Arc<PolicyStore>,
    admission: AdmissionEngine,
    flood: FloodDetector,
    forbidden: ForbiddenWordFilter,
    settings: ModerationSettings,
    self_id: Option<String>,
}

impl AdminFacade {
    pub fn new(
        store: Arc<PolicyStore>,
        settings: ModerationSettings,
        self_id: Option<String>,
    ) -> Self {
        Self {
            admission: AdmissionEngine::new(Arc::clone(&store), &settings),
            flood: FloodDetector::new(&settings, self_id.clone()),
            forbidden: ForbiddenWordFilter::new(&settings, self_id.clone()),
            store,
            settings,
            self_id,
        }
    }

    pub fn settings(&self) -> &ModerationSettings {
        &self.settings
    }

    fn is_self(&self, user: &str) -> bool {
        self.self_id.as_deref() == Some(user)
    }

    /// Decide a join request.
    ///
    /// Rejection rules go first. A request that survives them is approved
    /// only when its comment carries an accept keyword; otherwise it is
    /// left for a human.
    pub fn evaluate_join_request(&self, request: &JoinRequest) -> Decision {
        let decision = match self
            .admission
            .classify(&request.group, &request.user, request.comment())
        {
            Decision::Indeterminate => match request.comment() {
                Some(comment) if self.admission.should_approve(&request.group, comment) => {
                    Decision::Approve(ApproveReason::AcceptKeyword)
                }
                _ => Decision::Indeterminate,
            },
            decided => decided,
        };

        match decision {
            Decision::Reject(reason) => info!(
                group = %request.group,
                user = %request.user,
                reason = reason.code(),
                "Join request rejected"
            ),
            Decision::Approve(reason) => info!(
                group = %request.group,
                user = %request.user,
                reason = reason.code(),
                "Join request approved"
            ),
            Decision::Indeterminate => info!(
                group = %request.group,
                user = %request.user,
                "Join request left for review"
            ),
        }

        decision
    }

    /// Handle a voluntary leave.
    ///
    /// With leave blacklisting on, the user id is added to the group's
    /// blacklist. Returns whether the id was newly blacklisted.
    pub fn record_leave(&self, group: &str, user: &str) -> Result<bool, PolicyError> {
        if !self.settings.leave_blacklist || self.is_self(user) {
            return Ok(false);
        }

        let added = self.add_entries(group, PolicyList::RejectUserIds, &[user])?;
        if !added.is_empty() {
            info!(group, user, "Blacklisted member after voluntary leave");
        }
        Ok(!added.is_empty())
    }

    /// Feed one message into flood detection.
    pub fn record_activity(
        &self,
        group: &str,
        user: &str,
        at: DateTime<Utc>,
        has_content: bool,
    ) -> ThrottleDecision {
        let decision = self.flood.observe(group, user, at, has_content);
        if let ThrottleDecision::Throttle(duration) = decision {
            info!(group, user, secs = duration.as_secs_f64(), "Throttling flooding member");
        }
        decision
    }

    /// Check a message against the forbidden word list.
    pub fn scan_message(&self, group: &str, user: &str, text: &str) -> Option<ForbiddenHit> {
        let hit = self.forbidden.check(group, user, text)?;
        info!(group, user, word = %hit.word, "Forbidden word in message");
        Some(hit)
    }

    /// Mute to apply to a member who just joined, if any.
    pub fn join_mute(&self, user: &str) -> Option<Duration> {
        if self.is_self(user) || self.settings.join_mute.is_zero() {
            return None;
        }
        Some(self.settings.join_mute)
    }

    /// Greeting to post when `user` joins, if one is configured.
    pub fn join_welcome(&self, user: &str) -> Option<&str> {
        if self.is_self(user) {
            return None;
        }
        self.settings.join_welcome.as_deref()
    }

    /// Add entries to one of a group's lists. Persisted before returning.
    ///
    /// Returns the entries that were not already present.
    pub fn add_entries<S: AsRef<str>>(
        &self,
        group: &str,
        list: PolicyList,
        entries: &[S],
    ) -> Result<Vec<String>, PolicyError> {
        let added = self.store.mutate(group, |set| set.add(list, entries))?;
        if !added.is_empty() {
            info!(group, %list, ?added, "Policy entries added");
        }
        Ok(added)
    }

    /// Remove entries from one of a group's lists. Persisted before
    /// returning.
    ///
    /// Returns the entries that were present.
    pub fn remove_entries<S: AsRef<str>>(
        &self,
        group: &str,
        list: PolicyList,
        entries: &[S],
    ) -> Result<Vec<String>, PolicyError> {
        let removed = self.store.mutate(group, |set| set.remove(list, entries))?;
        if !removed.is_empty() {
            info!(group, %list, ?removed, "Policy entries removed");
        }
        Ok(removed)
    }

    /// Run a policy change on the blocking pool.
    ///
    /// The store writes and fsyncs the whole file before returning, which
    /// must not stall the async workers. Every mutation from a handler goes
    /// through here.
    pub async fn commit<R, F>(self: &Arc<Self>, f: F) -> anyhow::Result<R>
    where
        F: FnOnce(&AdminFacade) -> R + Send + 'static,
        R: Send + 'static,
    {
        let admin = Arc::clone(self);
        Ok(tokio::task::spawn_blocking(move || f(&admin)).await?)
    }

    /// Current entries of one of a group's lists.
    pub fn entries(&self, group: &str, list: PolicyList) -> Vec<String> {
        self.store.read(group, |set| set.entries(list))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::moderation::admission::RejectReason;

    fn facade(settings: ModerationSettings) -> (tempfile::TempDir, AdminFacade) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PolicyStore::load(dir.path().join("policy.json")));
        let facade = AdminFacade::new(store, settings, Some("999".to_string()));
        (dir, facade)
    }

    #[test]
    fn test_join_request_precedence() {
        let (_dir, admin) = facade(ModerationSettings {
            reject_without_keyword: true,
            ..Default::default()
        });
        admin
            .add_entries("g", PolicyList::AcceptKeywords, &["invite code"])
            .unwrap();
        admin.add_entries("g", PolicyList::RejectUserIds, &["42"]).unwrap();

        let request = |user: &str, comment: Option<&str>| {
            JoinRequest::new("g", user, comment.map(str::to_string))
        };

        assert_eq!(
            admin.evaluate_join_request(&request("42", Some("invite code"))),
            Decision::Reject(RejectReason::BlacklistedUser)
        );
        assert_eq!(
            admin.evaluate_join_request(&request("1", Some("hello"))),
            Decision::Reject(RejectReason::MissingAcceptKeyword)
        );
        assert_eq!(
            admin.evaluate_join_request(&request("1", Some("my Invite Code is X"))),
            Decision::Approve(ApproveReason::AcceptKeyword)
        );
        assert_eq!(admin.evaluate_join_request(&request("1", None)), Decision::Indeterminate);
    }

    #[test]
    fn test_no_accept_keywords_never_approves() {
        let (_dir, admin) = facade(ModerationSettings::default());

        assert_eq!(
            admin.evaluate_join_request(&JoinRequest::new("g", "1", Some("anything".into()))),
            Decision::Indeterminate
        );
    }

    #[test]
    fn test_record_leave_respects_setting() {
        let (_dir, off) = facade(ModerationSettings::default());
        assert!(!off.record_leave("g", "7").unwrap());
        assert!(off.entries("g", PolicyList::RejectUserIds).is_empty());

        let (_dir, on) = facade(ModerationSettings {
            leave_blacklist: true,
            ..Default::default()
        });
        assert!(on.record_leave("g", "7").unwrap());
        assert!(!on.record_leave("g", "7").unwrap());
        assert!(!on.record_leave("g", "999").unwrap());
        assert_eq!(on.entries("g", PolicyList::RejectUserIds), vec!["7"]);
    }

    #[test]
    fn test_mutations_are_idempotent_and_durable() {
        let (dir, admin) = facade(ModerationSettings::default());

        assert_eq!(
            admin.add_entries("g", PolicyList::RejectKeywords, &["spam"]).unwrap(),
            vec!["spam"]
        );
        assert!(admin.add_entries("g", PolicyList::RejectKeywords, &["SPAM"]).unwrap().is_empty());
        assert!(admin.remove_entries("g", PolicyList::RejectKeywords, &["nope"]).unwrap().is_empty());

        let reloaded = PolicyStore::load(dir.path().join("policy.json"));
        assert_eq!(reloaded.snapshot("g").entries(PolicyList::RejectKeywords), vec!["spam"]);
    }

    #[test]
    fn test_activity_and_join_mute() {
        let monitored: HashSet<String> = ["g".to_string()].into_iter().collect();
        let (_dir, admin) = facade(ModerationSettings {
            flood_sample_count: 2,
            flood_burst_interval: Duration::from_secs(1),
            flood_cooldown: Duration::from_secs(30),
            monitored_groups: monitored,
            join_mute: Duration::from_secs(120),
            ..Default::default()
        });

        let t0 = Utc::now();
        assert_eq!(admin.record_activity("g", "1", t0, true), ThrottleDecision::NoAction);
        assert_eq!(
            admin.record_activity("g", "1", t0 + chrono::TimeDelta::milliseconds(100), true),
            ThrottleDecision::Throttle(Duration::from_secs(30))
        );

        assert_eq!(admin.join_mute("1"), Some(Duration::from_secs(120)));
        assert_eq!(admin.join_mute("999"), None);
    }

    #[tokio::test]
    async fn test_commit_runs_mutation_off_the_runtime() {
        let (dir, admin) = facade(ModerationSettings::default());
        let admin = Arc::new(admin);

        let added = admin
            .commit(|admin| admin.add_entries("g", PolicyList::RejectUserIds, &["5"]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(added, vec!["5"]);
        let reloaded = PolicyStore::load(dir.path().join("policy.json"));
        assert!(reloaded.snapshot("g").is_blacklisted("5"));
    }

    #[test]
    fn test_join_welcome_skips_self() {
        let (_dir, admin) = facade(ModerationSettings {
            join_welcome: Some("Hi!".to_string()),
            ..Default::default()
        });

        assert_eq!(admin.join_welcome("1"), Some("Hi!"));
        assert_eq!(admin.join_welcome("999"), None);
    }
}
