//! Member removal commands.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use super::{Right, ensure_admin, reply};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::PolicyList;
use crate::moderation::{AdminFacade, ModerationApi};
use crate::utils::target_user;

/// Kick a member and describe the outcome. With `block` the id is also
/// added to the group's blacklist, so a later join request is declined.
///
/// The kick stands even if the blacklist cannot be saved.
pub async fn remove_member<A: ModerationApi>(
    api: &A,
    admin: &Arc<AdminFacade>,
    group: &str,
    user: &str,
    block: bool,
) -> anyhow::Result<String> {
    if let Err(e) = api.kick(group, user, block).await {
        warn!("Failed to remove {} from {}: {}", user, group, e);
        return Ok(format!("Could not remove {user}: {e}"));
    }
    if !block {
        return Ok(format!("{user} was removed."));
    }

    let (g, u) = (group.to_string(), user.to_string());
    let saved = admin
        .commit(move |admin| admin.add_entries(&g, PolicyList::RejectUserIds, &[u]))
        .await?;

    Ok(match saved {
        Ok(_) => format!("{user} was removed and blacklisted."),
        Err(e) => {
            warn!("Removed {} from {} but the blacklist was not saved: {}", user, group, e);
            format!("{user} was removed, but the blacklist could not be saved.")
        }
    })
}

async fn remove(bot: ThrottledBot, msg: Message, state: AppState, block: bool) -> anyhow::Result<()> {
    if !ensure_admin(&bot, &msg, &state, Right::RestrictMembers).await? {
        return Ok(());
    }

    let Some((target, _)) = target_user(&msg) else {
        return reply(&bot, &msg, "Reply to a message or give a user id.").await;
    };
    if state.is_owner(target.0) {
        return reply(&bot, &msg, "Bot owners cannot be removed.").await;
    }

    let group = msg.chat.id.0.to_string();
    let text = remove_member(&state.api, &state.admin, &group, &target.0.to_string(), block).await?;
    reply(&bot, &msg, text).await
}

/// Handle /kick.
pub async fn kick_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    remove(bot, msg, state, false).await
}

/// Handle /block.
pub async fn block_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    remove(bot, msg, state, true).await
}
