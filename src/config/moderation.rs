//! Moderation options handed to the engines at construction time.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::ConfigError;

use super::parse;

/// Per-deployment moderation options.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationSettings {
    /// Messages in a burst window. `0` disables flood detection.
    pub flood_sample_count: usize,

    /// Every gap inside a full window must be strictly below this.
    pub flood_burst_interval: Duration,

    /// Mute length, and the minimum time before the same member can be
    /// throttled again. Zero disables throttling.
    pub flood_cooldown: Duration,

    /// Windows idle for this long are dropped. Zero keeps them forever.
    pub flood_idle_evict: Duration,

    /// Groups where flood detection runs.
    pub monitored_groups: HashSet<String>,

    /// Reject join requests that miss every accept keyword of a group
    /// that has accept keywords.
    pub reject_without_keyword: bool,

    /// Process join requests at all.
    pub join_audit: bool,

    /// Send the join audit notice to bot owners instead of the group.
    pub audit_to_owners: bool,

    /// Blacklist members who leave on their own.
    pub leave_blacklist: bool,

    /// Mute applied to new members. Zero disables.
    pub join_mute: Duration,

    /// Greeting posted when a member joins.
    pub join_welcome: Option<String>,

    /// Length of `/mute` when no duration is given.
    pub default_mute: Duration,

    /// Words that get a message deleted.
    pub forbidden_words: Vec<String>,

    /// Groups where forbidden words are enforced.
    pub forbidden_groups: HashSet<String>,

    /// Mute applied on a forbidden word. Zero only deletes.
    pub forbidden_mute: Duration,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            flood_sample_count: 5,
            flood_burst_interval: Duration::from_secs(1),
            flood_cooldown: Duration::from_secs(300),
            flood_idle_evict: Duration::from_secs(3600),
            monitored_groups: HashSet::new(),
            reject_without_keyword: false,
            join_audit: true,
            audit_to_owners: false,
            leave_blacklist: false,
            join_mute: Duration::ZERO,
            join_welcome: None,
            default_mute: Duration::from_secs(600),
            forbidden_words: Vec::new(),
            forbidden_groups: HashSet::new(),
            forbidden_mute: Duration::ZERO,
        }
    }
}

impl ModerationSettings {
    /// Build settings from a key lookup, falling back to defaults for
    /// unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            flood_sample_count: parse::count(
                "FLOOD_SAMPLE_COUNT",
                lookup("FLOOD_SAMPLE_COUNT"),
                defaults.flood_sample_count,
            )?,
            flood_burst_interval: parse::seconds(
                "FLOOD_BURST_INTERVAL_SECS",
                lookup("FLOOD_BURST_INTERVAL_SECS"),
                defaults.flood_burst_interval,
            )?,
            flood_cooldown: parse::seconds(
                "FLOOD_COOLDOWN_SECS",
                lookup("FLOOD_COOLDOWN_SECS"),
                defaults.flood_cooldown,
            )?,
            flood_idle_evict: parse::seconds(
                "FLOOD_IDLE_EVICT_SECS",
                lookup("FLOOD_IDLE_EVICT_SECS"),
                defaults.flood_idle_evict,
            )?,
            monitored_groups: parse::set(lookup("MONITORED_GROUPS")),
            reject_without_keyword: parse::flag(
                "REJECT_WITHOUT_KEYWORD",
                lookup("REJECT_WITHOUT_KEYWORD"),
                defaults.reject_without_keyword,
            )?,
            join_audit: parse::flag("JOIN_AUDIT", lookup("JOIN_AUDIT"), defaults.join_audit)?,
            audit_to_owners: parse::flag(
                "AUDIT_TO_OWNERS",
                lookup("AUDIT_TO_OWNERS"),
                defaults.audit_to_owners,
            )?,
            leave_blacklist: parse::flag(
                "LEAVE_BLACKLIST",
                lookup("LEAVE_BLACKLIST"),
                defaults.leave_blacklist,
            )?,
            join_mute: parse::seconds("JOIN_MUTE_SECS", lookup("JOIN_MUTE_SECS"), defaults.join_mute)?,
            join_welcome: parse::non_empty(lookup("JOIN_WELCOME")),
            default_mute: parse::seconds(
                "MUTE_DEFAULT_SECS",
                lookup("MUTE_DEFAULT_SECS"),
                defaults.default_mute,
            )?,
            forbidden_words: parse::list(lookup("FORBIDDEN_WORDS")),
            forbidden_groups: parse::set(lookup("FORBIDDEN_GROUPS")),
            forbidden_mute: parse::seconds(
                "FORBIDDEN_MUTE_SECS",
                lookup("FORBIDDEN_MUTE_SECS"),
                defaults.forbidden_mute,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<ModerationSettings, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ModerationSettings::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_empty_lookup_gives_defaults() {
        assert_eq!(settings(&[]).unwrap(), ModerationSettings::default());
    }

    #[test]
    fn test_parses_flood_options() {
        let s = settings(&[
            ("FLOOD_SAMPLE_COUNT", "5"),
            ("FLOOD_BURST_INTERVAL_SECS", "0.75"),
            ("FLOOD_COOLDOWN_SECS", "60"),
            ("MONITORED_GROUPS", "-100123, -100456,,"),
            ("REJECT_WITHOUT_KEYWORD", "Yes"),
        ])
        .unwrap();

        assert_eq!(s.flood_sample_count, 5);
        assert_eq!(s.flood_burst_interval, Duration::from_millis(750));
        assert_eq!(s.flood_cooldown, Duration::from_secs(60));
        assert_eq!(s.monitored_groups.len(), 2);
        assert!(s.monitored_groups.contains("-100456"));
        assert!(s.reject_without_keyword);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            settings(&[("FLOOD_COOLDOWN_SECS", "-1")]),
            Err(ConfigError::Invalid { key: "FLOOD_COOLDOWN_SECS", .. })
        ));
        assert!(matches!(
            settings(&[("LEAVE_BLACKLIST", "maybe")]),
            Err(ConfigError::Invalid { key: "LEAVE_BLACKLIST", .. })
        ));
        assert!(matches!(
            settings(&[("FLOOD_SAMPLE_COUNT", "five")]),
            Err(ConfigError::Invalid { key: "FLOOD_SAMPLE_COUNT", .. })
        ));
    }

    #[test]
    fn test_join_options() {
        let s = settings(&[
            ("JOIN_WELCOME", "  Welcome! Read the pinned rules.  "),
            ("MUTE_DEFAULT_SECS", "120"),
        ])
        .unwrap();
        assert_eq!(s.join_welcome.as_deref(), Some("Welcome! Read the pinned rules."));
        assert_eq!(s.default_mute, Duration::from_secs(120));

        assert_eq!(settings(&[("JOIN_WELCOME", "   ")]).unwrap().join_welcome, None);
    }

    #[test]
    fn test_forbidden_word_list_keeps_order() {
        let s = settings(&[("FORBIDDEN_WORDS", "spam, scam ,casino")]).unwrap();
        assert_eq!(s.forbidden_words, vec!["spam", "scam", "casino"]);
    }
}
