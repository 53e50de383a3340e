//! Join request admission.
//!
//! Rules are checked in a fixed order and the first hit wins:
//! id blacklist, reject keywords, then missing accept keyword.

use std::fmt;
use std::sync::Arc;

use crate::config::ModerationSettings;
use crate::database::{PolicySet, PolicyStore};

/// Why a join request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    BlacklistedUser,
    BlacklistedKeyword,
    MissingAcceptKeyword,
}

impl RejectReason {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::BlacklistedUser => "blacklisted-user",
            Self::BlacklistedKeyword => "blacklisted-keyword",
            Self::MissingAcceptKeyword => "missing-accept-keyword",
        }
    }

    /// Text shown to people.
    pub fn describe(self) -> &'static str {
        match self {
            Self::BlacklistedUser => "Blacklisted user",
            Self::BlacklistedKeyword => "Matched a blacklisted keyword",
            Self::MissingAcceptKeyword => "No join keyword in the request",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Why a join request was approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApproveReason {
    AcceptKeyword,
}

impl ApproveReason {
    pub fn code(self) -> &'static str {
        match self {
            Self::AcceptKeyword => "accept-keyword",
        }
    }
}

impl fmt::Display for ApproveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of evaluating a join request.
///
/// `Indeterminate` is neither approval nor rejection: the request waits
/// for a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve(ApproveReason),
    Reject(RejectReason),
    Indeterminate,
}

/// Empty comments count as no comment.
fn present(comment: Option<&str>) -> Option<&str> {
    comment.filter(|c| !c.is_empty())
}

/// Rejection rules over one group's policy.
///
/// Never returns `Approve`; approval is a separate check, see
/// [`matches_accept_keyword`].
pub fn evaluate(
    policy: &PolicySet,
    user_id: &str,
    comment: Option<&str>,
    reject_without_keyword: bool,
) -> Decision {
    if policy.is_blacklisted(user_id) {
        return Decision::Reject(RejectReason::BlacklistedUser);
    }

    let Some(comment) = present(comment) else {
        return Decision::Indeterminate;
    };
    let lowered = comment.to_lowercase();

    if policy.reject_keywords.find_in_lowercase(&lowered).is_some() {
        return Decision::Reject(RejectReason::BlacklistedKeyword);
    }

    if reject_without_keyword
        && !policy.accept_keywords.is_empty()
        && policy.accept_keywords.find_in_lowercase(&lowered).is_none()
    {
        return Decision::Reject(RejectReason::MissingAcceptKeyword);
    }

    Decision::Indeterminate
}

/// Whether the comment carries one of the group's accept keywords.
pub fn matches_accept_keyword(policy: &PolicySet, comment: &str) -> bool {
    present(Some(comment)).is_some_and(|c| policy.accept_keywords.matches(c))
}

/// Admission rules evaluated against the live policy store.
#[derive(Debug, Clone)]
pub struct AdmissionEngine {
    store: Arc<PolicyStore>,
    reject_without_keyword: bool,
}

impl AdmissionEngine {
    pub fn new(store: Arc<PolicyStore>, settings: &ModerationSettings) -> Self {
        Self {
            store,
            reject_without_keyword: settings.reject_without_keyword,
        }
    }

    /// Rejection precedence for a request. `Reject` or `Indeterminate`.
    pub fn classify(&self, group: &str, user_id: &str, comment: Option<&str>) -> Decision {
        self.store.read(group, |policy| {
            evaluate(policy, user_id, comment, self.reject_without_keyword)
        })
    }

    /// Accept keyword check used to actively approve.
    pub fn should_approve(&self, group: &str, comment: &str) -> bool {
        self.store
            .read(group, |policy| matches_accept_keyword(policy, comment))
    }
}
