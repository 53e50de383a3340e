//! Mute commands for single members and for the whole group.

use std::time::Duration;

use teloxide::prelude::*;
use tracing::warn;

use super::{Right, ensure_admin, reply};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::moderation::ModerationApi;
use crate::utils::{command_args, format_duration, parse_duration, target_user};

/// Mute length from the arguments left after the target.
///
/// No argument gives `default`; an unparsable one gives `None`.
pub fn mute_duration(rest: &[&str], default: Duration) -> Option<Duration> {
    match rest.first() {
        Some(raw) => parse_duration(raw).filter(|d| !d.is_zero()),
        None => Some(default),
    }
}

pub async fn mute_member<A: ModerationApi>(
    api: &A,
    group: &str,
    user: &str,
    duration: Duration,
) -> String {
    match api.mute(group, user, duration).await {
        Ok(()) => format!("{user} was muted for {}.", format_duration(duration)),
        Err(e) => {
            warn!("Failed to mute {} in {}: {}", user, group, e);
            format!("Could not mute {user}: {e}")
        }
    }
}

pub async fn unmute_member<A: ModerationApi>(api: &A, group: &str, user: &str) -> String {
    match api.unmute(group, user).await {
        Ok(()) => format!("{user} can talk again."),
        Err(e) => {
            warn!("Failed to unmute {} in {}: {}", user, group, e);
            format!("Could not unmute {user}: {e}")
        }
    }
}

pub async fn lock_group<A: ModerationApi>(api: &A, group: &str, locked: bool) -> String {
    match (api.set_group_lock(group, locked).await, locked) {
        (Ok(()), true) => "The group is muted. Only admins can talk.".to_string(),
        (Ok(()), false) => "The group is open again.".to_string(),
        (Err(e), _) => {
            warn!("Failed to change lock of {}: {}", group, e);
            format!("Could not change the group lock: {e}")
        }
    }
}

async fn restrict(bot: ThrottledBot, msg: Message, state: AppState, mute: bool) -> anyhow::Result<()> {
    if !ensure_admin(&bot, &msg, &state, Right::RestrictMembers).await? {
        return Ok(());
    }

    let Some((target, consumed)) = target_user(&msg) else {
        return reply(&bot, &msg, "Reply to a message or give a user id.").await;
    };

    let group = msg.chat.id.0.to_string();
    let user = target.0.to_string();

    if !mute {
        let text = unmute_member(&state.api, &group, &user).await;
        return reply(&bot, &msg, text).await;
    }

    if state.is_owner(target.0)
        || state.permissions.is_admin(msg.chat.id, target).await.unwrap_or(false)
    {
        return reply(&bot, &msg, "Admins cannot be muted.").await;
    }

    let args = command_args(msg.text().unwrap_or(""));
    let rest = args.get(consumed..).unwrap_or_default();
    let Some(duration) = mute_duration(rest, state.admin.settings().default_mute) else {
        return reply(&bot, &msg, "Usage: /mute <reply|user_id> [duration, e.g. 600, 10m, 2h]").await;
    };

    let text = mute_member(&state.api, &group, &user, duration).await;
    reply(&bot, &msg, text).await
}

/// Handle /mute.
pub async fn mute_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    restrict(bot, msg, state, true).await
}

/// Handle /unmute.
pub async fn unmute_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    restrict(bot, msg, state, false).await
}

async fn lock(bot: ThrottledBot, msg: Message, state: AppState, locked: bool) -> anyhow::Result<()> {
    if !ensure_admin(&bot, &msg, &state, Right::RestrictMembers).await? {
        return Ok(());
    }
    let text = lock_group(&state.api, &msg.chat.id.0.to_string(), locked).await;
    reply(&bot, &msg, text).await
}

/// Handle /lock.
pub async fn lock_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    lock(bot, msg, state, true).await
}

/// Handle /unlock.
pub async fn unlock_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    lock(bot, msg, state, false).await
}
