//! Permission checker with caching.

use teloxide::prelude::*;
use teloxide::types::{ChatId, ChatMember, ChatMemberKind, UserId};
use tracing::debug;

use crate::cache::{CacheConfig, TypedCache};

/// Rights of a chat administrator that moderation cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminInfo {
    pub is_owner: bool,
    pub can_delete_messages: bool,
    pub can_restrict_members: bool,
    pub can_invite_users: bool,
}

impl AdminInfo {
    fn from_chat_member(member: &ChatMember) -> Option<Self> {
        match &member.kind {
            ChatMemberKind::Owner(_) => Some(Self::full(true)),
            ChatMemberKind::Administrator(admin) => Some(Self {
                is_owner: false,
                can_delete_messages: admin.can_delete_messages,
                can_restrict_members: admin.can_restrict_members,
                can_invite_users: admin.can_invite_users,
            }),
            _ => None,
        }
    }

    fn full(is_owner: bool) -> Self {
        Self {
            is_owner,
            can_delete_messages: true,
            can_restrict_members: true,
            can_invite_users: true,
        }
    }
}

/// (chat_id, user_id)
type AdminCacheKey = (i64, u64);

/// Permission checker with caching support.
///
/// Non-admins are cached too, as `None`.
#[derive(Clone, Debug)]
pub struct Permissions {
    bot: Bot,
    cache: TypedCache<AdminCacheKey, Option<AdminInfo>>,
    owner_ids: Vec<u64>,
}

impl Permissions {
    pub fn with_owners(bot: Bot, owner_ids: Vec<u64>) -> Self {
        Self {
            bot,
            cache: TypedCache::new("admin_rights", CacheConfig::admin_rights()),
            owner_ids,
        }
    }

    #[inline]
    pub fn is_bot_owner(&self, user_id: UserId) -> bool {
        self.owner_ids.contains(&user_id.0)
    }

    /// Admin rights of a user in a chat, `None` for regular members.
    pub async fn get_admin_info(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> anyhow::Result<Option<AdminInfo>> {
        if self.is_bot_owner(user_id) {
            return Ok(Some(AdminInfo::full(true)));
        }

        let cache_key = (chat_id.0, user_id.0);
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!("{} cache hit for user {} in chat {}", self.cache.name(), user_id, chat_id);
            return Ok(cached);
        }

        let member = self.bot.get_chat_member(chat_id, user_id).await?;
        let info = AdminInfo::from_chat_member(&member);
        self.cache.insert(cache_key, info.clone());

        Ok(info)
    }

    pub async fn is_admin(&self, chat_id: ChatId, user_id: UserId) -> anyhow::Result<bool> {
        if self.is_bot_owner(user_id) {
            return Ok(true);
        }
        Ok(self.get_admin_info(chat_id, user_id).await?.is_some())
    }

    /// Mute, kick and policy changes.
    pub async fn can_restrict_members(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> anyhow::Result<bool> {
        if self.is_bot_owner(user_id) {
            return Ok(true);
        }
        Ok(self
            .get_admin_info(chat_id, user_id)
            .await?
            .is_some_and(|a| a.can_restrict_members))
    }

    /// Answering join requests.
    pub async fn can_invite_users(&self, chat_id: ChatId, user_id: UserId) -> anyhow::Result<bool> {
        if self.is_bot_owner(user_id) {
            return Ok(true);
        }
        Ok(self
            .get_admin_info(chat_id, user_id)
            .await?
            .is_some_and(|a| a.can_invite_users))
    }

    /// Drop cached rights, e.g. after a promotion or demotion.
    pub fn invalidate(&self, chat_id: ChatId, user_id: UserId) {
        self.cache.invalidate(&(chat_id.0, user_id.0));
        debug!("Invalidated admin cache for user {} in chat {}", user_id, chat_id);
    }
}
