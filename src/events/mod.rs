//! Event handlers.
//!
//! Each submodule exposes a generic `process_*`/`check_*` function over
//! [`ModerationApi`](crate::moderation::ModerationApi) and, where it reacts
//! to a distinct update kind, a teloxide `handler()`.

pub mod antiflood;
pub mod forbidden;
pub mod join_request;
pub mod leave;
pub mod new_member;

use chrono::Utc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberUpdated, MessageKind};
use tracing::{debug, error};

use crate::bot::dispatcher::AppState;

/// Handler for chat member updates (joins and leaves).
pub fn member_event_handler() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .inspect(refresh_admin_cache)
        .branch(new_member::handler())
        .branch(leave::handler())
}

/// Member status changed; cached rights may be stale.
fn refresh_admin_cache(update: ChatMemberUpdated, state: AppState) {
    state
        .permissions
        .invalidate(update.chat.id, update.new_chat_member.user.id);
}

/// Handler for group messages that are not commands.
///
/// Runs every message check; one failing does not stop the others.
pub fn message_event_handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(|msg: Message| msg.chat.is_group() || msg.chat.is_supergroup())
        .endpoint(unified_message_handler)
}

async fn unified_message_handler(msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if user.is_bot || state.is_owner(user.id.0) {
        return Ok(());
    }

    // Admins are exempt from automatic moderation.
    if state
        .permissions
        .is_admin(msg.chat.id, user.id)
        .await
        .unwrap_or(false)
    {
        return Ok(());
    }

    let group = msg.chat.id.0.to_string();
    let user_id = user.id.0.to_string();
    let text = msg.text().or_else(|| msg.caption()).unwrap_or("");

    debug!(
        "unified_message_handler: chat={}, user={}, len={}",
        group,
        user_id,
        text.len()
    );

    if !text.is_empty()
        && let Err(e) =
            forbidden::check_forbidden_words(&state.api, &state.admin, &group, &user_id, msg.id.0, text).await
    {
        error!("Forbidden word check error: {}", e);
    }

    // Telegram message dates have one-second resolution; bursts need the
    // receive time.
    let has_content = matches!(msg.kind, MessageKind::Common(_));
    if let Err(e) =
        antiflood::check_antiflood(&state.api, &state.admin, &group, &user_id, Utc::now(), has_content).await
    {
        error!("Antiflood error: {}", e);
    }

    Ok(())
}
