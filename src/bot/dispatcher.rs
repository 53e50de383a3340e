//! Message dispatcher setup.
//!
//! Builds the dispatcher with all command handlers and event handlers.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::{DefaultKey, UpdateHandler};
use teloxide::prelude::*;

use super::api::TelegramModeration;
use crate::events;
use crate::moderation::AdminFacade;
use crate::permissions::Permissions;
use crate::plugins;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Moderation core.
    pub admin: Arc<AdminFacade>,

    /// Moderation actions against Telegram.
    pub api: TelegramModeration,

    /// Permission checker with admin caching.
    pub permissions: Permissions,

    /// Owner user IDs (bypass all restrictions).
    pub owner_ids: Vec<u64>,
}

impl AppState {
    pub fn new(bot: ThrottledBot, admin: Arc<AdminFacade>, owner_ids: Vec<u64>) -> Self {
        // Permission lookups go around the throttle queue.
        let permissions = Permissions::with_owners(bot.inner().clone(), owner_ids.clone());

        Self {
            admin,
            api: TelegramModeration::new(bot),
            permissions,
            owner_ids,
        }
    }

    /// Check if a user is a bot owner.
    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_ids.contains(&user_id)
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    admin: Arc<AdminFacade>,
    owner_ids: Vec<u64>,
) -> Dispatcher<ThrottledBot, anyhow::Error, DefaultKey> {
    let state = AppState::new(bot.clone(), admin, owner_ids);

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    // Commands first; anything else in a group goes through moderation.
    let message_handler = Update::filter_message()
        .branch(plugins::command_handler())
        .branch(events::message_event_handler());

    let member_handler = Update::filter_chat_member().branch(events::member_event_handler());

    dptree::entry()
        .branch(message_handler)
        .branch(member_handler)
        .branch(events::join_request::handler())
}
