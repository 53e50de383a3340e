//! Flood throttling for group messages.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::moderation::{AdminFacade, ModerationApi, ThrottleDecision};
use crate::utils::format_duration;

/// Feed a message into flood detection and mute the sender on a burst.
///
/// The cool-down is already recorded when the mute goes out, so a failed
/// mute is not retried on the next message.
pub async fn check_antiflood<A: ModerationApi>(
    api: &A,
    admin: &AdminFacade,
    group: &str,
    user: &str,
    at: DateTime<Utc>,
    has_content: bool,
) -> anyhow::Result<ThrottleDecision> {
    let decision = admin.record_activity(group, user, at, has_content);
    let ThrottleDecision::Throttle(duration) = decision else {
        return Ok(decision);
    };

    if let Err(e) = api.mute(group, user, duration).await {
        warn!("Failed to mute flooding member {} in {}: {}", user, group, e);
        return Ok(decision);
    }

    let name = api
        .fetch_display_name(group, user)
        .await
        .unwrap_or_else(|_| user.to_string());
    api.notify(
        group,
        &format!("{name} was muted for {} for flooding", format_duration(duration)),
    )
    .await?;

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::TimeDelta;

    use super::*;
    use crate::config::ModerationSettings;
    use crate::database::PolicyStore;
    use crate::moderation::api::testing::{Action, RecordingApi};

    fn admin(dir: &tempfile::TempDir) -> AdminFacade {
        let store = Arc::new(PolicyStore::load(dir.path().join("policy.json")));
        let settings = ModerationSettings {
            flood_sample_count: 3,
            flood_burst_interval: Duration::from_secs(1),
            flood_cooldown: Duration::from_secs(300),
            monitored_groups: ["-1".to_string()].into_iter().collect(),
            ..Default::default()
        };
        AdminFacade::new(store, settings, None)
    }

    #[tokio::test]
    async fn test_burst_mutes_once_and_announces() {
        let dir = tempfile::tempdir().unwrap();
        let admin = admin(&dir);
        let api = RecordingApi::new().with_name("7", "Spammer");
        let t0 = Utc::now();

        for i in 0..6 {
            check_antiflood(&api, &admin, "-1", "7", t0 + TimeDelta::milliseconds(i * 200), true)
                .await
                .unwrap();
        }

        let mutes: Vec<_> = api
            .actions()
            .into_iter()
            .filter(|a| matches!(a, Action::Mute { .. }))
            .collect();
        assert_eq!(mutes.len(), 1);
        assert_eq!(
            api.notices(),
            vec![("-1".to_string(), "Spammer was muted for 5 minutes for flooding".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_mute_keeps_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let admin = admin(&dir);
        let api = RecordingApi::new().failing_mutes();
        let t0 = Utc::now();

        let mut throttles = 0;
        for i in 0..6 {
            let decision = check_antiflood(&api, &admin, "-1", "7", t0 + TimeDelta::milliseconds(i * 200), true)
                .await
                .unwrap();
            if matches!(decision, ThrottleDecision::Throttle(_)) {
                throttles += 1;
            }
        }

        assert_eq!(throttles, 1);
        assert!(api.notices().is_empty());
    }
}
