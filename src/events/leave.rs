//! Voluntary leave handling.
//!
//! A member who leaves on their own is announced and, with
//! `LEAVE_BLACKLIST` on, barred from rejoining through a join request.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, ChatMemberUpdated};
use tracing::{debug, error, warn};

use crate::bot::dispatcher::AppState;
use crate::moderation::{AdminFacade, ModerationApi};

/// Returns the handler for voluntary leaves.
pub fn handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(is_voluntary_leave).endpoint(leave_handler)
}

/// Member was present, is now `Left` (not banned), and did it themselves.
fn is_voluntary_leave(update: ChatMemberUpdated) -> bool {
    let old = &update.old_chat_member;
    let new = &update.new_chat_member;

    old.is_present()
        && matches!(new.kind, ChatMemberKind::Left)
        && update.from.id == old.user.id
        && !old.user.is_bot
}

async fn leave_handler(update: ChatMemberUpdated, state: AppState) -> anyhow::Result<()> {
    let user = &update.old_chat_member.user;
    debug!("Member {} left chat {} on their own", user.id, update.chat.id);

    process_leave(
        &state.api,
        &state.admin,
        &update.chat.id.0.to_string(),
        &user.id.0.to_string(),
        &user.full_name(),
    )
    .await?;
    Ok(())
}

/// Announce a voluntary leave and blacklist if configured.
///
/// Returns whether the member was newly blacklisted.
pub async fn process_leave<A: ModerationApi>(
    api: &A,
    admin: &Arc<AdminFacade>,
    group: &str,
    user: &str,
    name: &str,
) -> anyhow::Result<bool> {
    let (g, u) = (group.to_string(), user.to_string());
    let blacklisted = match admin.commit(move |admin| admin.record_leave(&g, &u)).await? {
        Ok(added) => added,
        Err(e) => {
            error!(group, user, "Failed to blacklist leaving member: {}", e);
            false
        }
    };

    let mut notice = format!("{name} ({user}) left the group");
    if blacklisted {
        notice.push_str(" and has been blacklisted");
    }
    if let Err(e) = api.notify(group, &notice).await {
        warn!("Failed to announce leave in {}: {}", group, e);
    }

    Ok(blacklisted)
}
