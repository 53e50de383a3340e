//! Forbidden word filtering for group messages.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::ModerationSettings;

/// A message that contains a forbidden word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenHit {
    /// The configured word that matched.
    pub word: String,
    /// Mute to apply alongside the deletion, if any.
    pub mute: Option<Duration>,
}

/// Case-sensitive substring filter scoped to a set of groups.
#[derive(Debug, Clone)]
pub struct ForbiddenWordFilter {
    words: Vec<String>,
    groups: HashSet<String>,
    mute: Option<Duration>,
    self_id: Option<String>,
}

impl ForbiddenWordFilter {
    pub fn new(settings: &ModerationSettings, self_id: Option<String>) -> Self {
        Self {
            words: settings
                .forbidden_words
                .iter()
                .map(|w| w.trim())
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect(),
            groups: settings.forbidden_groups.clone(),
            mute: (!settings.forbidden_mute.is_zero()).then_some(settings.forbidden_mute),
            self_id,
        }
    }

    /// First configured word found in `text`, in configuration order.
    pub fn check(&self, group: &str, user: &str, text: &str) -> Option<ForbiddenHit> {
        if self.self_id.as_deref() == Some(user) || !self.groups.contains(group) {
            return None;
        }

        self.words
            .iter()
            .find(|word| text.contains(word.as_str()))
            .map(|word| ForbiddenHit {
                word: word.clone(),
                mute: self.mute,
            })
    }
}
