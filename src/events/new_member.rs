//! New member handling: optional greeting and mute on join.

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;
use tracing::{debug, warn};

use crate::bot::dispatcher::AppState;
use crate::moderation::{AdminFacade, ModerationApi};

/// Returns the handler for member joins.
pub fn handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(is_member_joined).endpoint(new_member_handler)
}

fn is_member_joined(update: ChatMemberUpdated) -> bool {
    !update.old_chat_member.is_present() && update.new_chat_member.is_present()
}

async fn new_member_handler(update: ChatMemberUpdated, state: AppState) -> anyhow::Result<()> {
    let user = &update.new_chat_member.user;
    debug!("Member {} joined chat {}", user.id, update.chat.id);

    process_new_member(
        &state.api,
        &state.admin,
        &update.chat.id.0.to_string(),
        &user.id.0.to_string(),
    )
    .await;
    Ok(())
}

/// Post the greeting and apply the join mute, whichever are configured.
/// Returns whether the mute was applied.
pub async fn process_new_member<A: ModerationApi>(
    api: &A,
    admin: &AdminFacade,
    group: &str,
    user: &str,
) -> bool {
    if let Some(welcome) = admin.join_welcome(user)
        && let Err(e) = api.notify(group, welcome).await
    {
        warn!("Failed to greet new member {} in {}: {}", user, group, e);
    }

    let Some(duration) = admin.join_mute(user) else {
        return false;
    };

    match api.mute(group, user, duration).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to mute new member {} in {}: {}", user, group, e);
            false
        }
    }
}
