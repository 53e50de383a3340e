//! Telegram implementation of the moderation actions.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use teloxide::prelude::*;
use teloxide::types::{ChatPermissions, MessageId};
use tracing::{debug, info};

use super::dispatcher::ThrottledBot;
use crate::cache::{CacheConfig, TypedCache};
use crate::moderation::{JoinRequest, ModerationApi};

fn chat_id(raw: &str) -> anyhow::Result<ChatId> {
    raw.parse::<i64>()
        .map(ChatId)
        .with_context(|| format!("invalid chat id {raw:?}"))
}

fn user_id(raw: &str) -> anyhow::Result<UserId> {
    raw.parse::<u64>()
        .map(UserId)
        .with_context(|| format!("invalid user id {raw:?}"))
}

/// End of a restriction of `duration` starting at `now`.
///
/// Telegram treats restrictions shorter than 30 seconds or longer than
/// 366 days as permanent, so the length is clamped to that range.
fn restriction_until(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    let (min, max) = (TimeDelta::seconds(30), TimeDelta::days(366));
    let length = TimeDelta::from_std(duration).unwrap_or(max).clamp(min, max);
    now + length
}

/// Rights a member gets back on unmute.
fn member_permissions() -> ChatPermissions {
    ChatPermissions::SEND_MESSAGES
        | ChatPermissions::SEND_AUDIOS
        | ChatPermissions::SEND_DOCUMENTS
        | ChatPermissions::SEND_PHOTOS
        | ChatPermissions::SEND_VIDEOS
        | ChatPermissions::SEND_VIDEO_NOTES
        | ChatPermissions::SEND_VOICE_NOTES
        | ChatPermissions::SEND_POLLS
        | ChatPermissions::SEND_OTHER_MESSAGES
        | ChatPermissions::ADD_WEB_PAGE_PREVIEWS
        | ChatPermissions::INVITE_USERS
}

/// [`ModerationApi`] over the rate-limited bot.
#[derive(Clone)]
pub struct TelegramModeration {
    bot: ThrottledBot,
    names: TypedCache<(i64, u64), String>,
}

impl TelegramModeration {
    pub fn new(bot: ThrottledBot) -> Self {
        Self {
            bot,
            names: TypedCache::new("display_names", CacheConfig::display_names()),
        }
    }
}

impl ModerationApi for TelegramModeration {
    async fn mute(&self, group: &str, user: &str, duration: Duration) -> anyhow::Result<()> {
        let until = restriction_until(Utc::now(), duration);
        self.bot
            .restrict_chat_member(chat_id(group)?, user_id(user)?, ChatPermissions::empty())
            .until_date(until)
            .await?;
        debug!(group, user, secs = duration.as_secs(), "Member muted");
        Ok(())
    }

    async fn unmute(&self, group: &str, user: &str) -> anyhow::Result<()> {
        self.bot
            .restrict_chat_member(chat_id(group)?, user_id(user)?, member_permissions())
            .await?;
        debug!(group, user, "Member unmuted");
        Ok(())
    }

    async fn set_group_lock(&self, group: &str, locked: bool) -> anyhow::Result<()> {
        let permissions = if locked {
            ChatPermissions::empty()
        } else {
            member_permissions()
        };
        self.bot
            .set_chat_permissions(chat_id(group)?, permissions)
            .await?;
        info!(group, locked, "Group lock changed");
        Ok(())
    }

    async fn kick(&self, group: &str, user: &str, blacklist: bool) -> anyhow::Result<()> {
        let (chat, member) = (chat_id(group)?, user_id(user)?);
        self.bot.ban_chat_member(chat, member).await?;
        if !blacklist {
            // Ban then unban = kick
            self.bot
                .unban_chat_member(chat, member)
                .only_if_banned(true)
                .await?;
        }
        Ok(())
    }

    async fn respond_to_join_request(
        &self,
        request: &JoinRequest,
        approve: bool,
        reason: Option<&str>,
    ) -> anyhow::Result<()> {
        let (chat, member) = (chat_id(&request.group)?, user_id(&request.user)?);
        if approve {
            self.bot.approve_chat_join_request(chat, member).await?;
        } else {
            // Telegram has no field for a decline reason.
            self.bot.decline_chat_join_request(chat, member).await?;
            if let Some(reason) = reason {
                info!(group = %request.group, user = %request.user, reason, "Declined join request");
            }
        }
        Ok(())
    }

    async fn fetch_display_name(&self, group: &str, user: &str) -> anyhow::Result<String> {
        let (chat, member) = (chat_id(group)?, user_id(user)?);
        let key = (chat.0, member.0);
        if let Some(name) = self.names.get(&key) {
            return Ok(name);
        }

        let name = self.bot.get_chat_member(chat, member).await?.user.full_name();
        self.names.insert(key, name.clone());
        Ok(name)
    }

    async fn retract_message(&self, group: &str, message_id: i32) -> anyhow::Result<()> {
        self.bot
            .delete_message(chat_id(group)?, MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn notify(&self, chat: &str, text: &str) -> anyhow::Result<()> {
        self.bot.send_message(chat_id(chat)?, text).await?;
        Ok(())
    }
}
