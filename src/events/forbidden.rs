//! Forbidden word enforcement for group messages.

use tracing::warn;

use crate::moderation::{AdminFacade, ForbiddenHit, ModerationApi};

/// Delete a message that contains a forbidden word and mute its sender
/// when a mute is configured.
///
/// A failed delete does not spare the sender the mute.
pub async fn check_forbidden_words<A: ModerationApi>(
    api: &A,
    admin: &AdminFacade,
    group: &str,
    user: &str,
    message_id: i32,
    text: &str,
) -> anyhow::Result<Option<ForbiddenHit>> {
    let Some(hit) = admin.scan_message(group, user, text) else {
        return Ok(None);
    };

    if let Err(e) = api.retract_message(group, message_id).await {
        warn!("Failed to delete message {} in {}: {}", message_id, group, e);
    }

    if let Some(duration) = hit.mute
        && let Err(e) = api.mute(group, user, duration).await
    {
        warn!("Failed to mute {} in {} after forbidden word: {}", user, group, e);
    }

    Ok(Some(hit))
}
