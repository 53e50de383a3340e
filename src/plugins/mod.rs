//! Admin commands.
//!
//! Add new commands by:
//! 1. Adding a variant to [`Command`]
//! 2. Implementing the handler in a submodule
//! 3. Adding the branch to `command_handler()`

pub mod join;
pub mod members;
pub mod policy;
pub mod restrict;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ReplyParameters;
use teloxide::utils::command::BotCommands;
use tracing::debug;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::PolicyList;

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Moderation commands:")]
pub enum Command {
    #[command(description = "Show this list")]
    Modhelp,

    // Accept keywords
    #[command(description = "Add join keywords: /addkeyword <word>...")]
    Addkeyword,

    #[command(description = "Remove join keywords: /delkeyword <word>...")]
    Delkeyword,

    #[command(description = "List join keywords")]
    Keywords,

    // Reject keywords
    #[command(description = "Add rejected keywords: /addblackword <word>...")]
    Addblackword,

    #[command(description = "Remove rejected keywords: /delblackword <word>...")]
    Delblackword,

    #[command(description = "List rejected keywords")]
    Blackwords,

    // Id blacklist
    #[command(description = "Blacklist user ids: /blacklist <id>...")]
    Blacklist,

    #[command(description = "Remove user ids from the blacklist: /unblacklist <id>...")]
    Unblacklist,

    #[command(description = "List blacklisted user ids")]
    Blacklisted,

    // Join request review
    #[command(description = "Approve a pending join request: /acceptjoin <id>")]
    Acceptjoin,

    #[command(description = "Decline a pending join request: /declinejoin <id> [reason]")]
    Declinejoin,

    // Members
    #[command(description = "Kick a member (reply or id)")]
    Kick,

    #[command(description = "Kick a member and blacklist them (reply or id)")]
    Block,

    #[command(description = "Mute a member: /mute <reply|id> [duration]")]
    Mute,

    #[command(description = "Unmute a member (reply or id)")]
    Unmute,

    #[command(description = "Mute everyone except admins")]
    Lock,

    #[command(description = "Lift the group-wide mute")]
    Unlock,
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Modhelp].endpoint(handle_help))
        // Accept keywords
        .branch(case![Command::Addkeyword].endpoint(policy::add_keyword_command))
        .branch(case![Command::Delkeyword].endpoint(policy::del_keyword_command))
        .branch(case![Command::Keywords].endpoint(policy::keywords_command))
        // Reject keywords
        .branch(case![Command::Addblackword].endpoint(policy::add_blackword_command))
        .branch(case![Command::Delblackword].endpoint(policy::del_blackword_command))
        .branch(case![Command::Blackwords].endpoint(policy::blackwords_command))
        // Id blacklist
        .branch(case![Command::Blacklist].endpoint(policy::blacklist_command))
        .branch(case![Command::Unblacklist].endpoint(policy::unblacklist_command))
        .branch(case![Command::Blacklisted].endpoint(policy::blacklisted_command))
        // Join requests
        .branch(case![Command::Acceptjoin].endpoint(join::acceptjoin_command))
        .branch(case![Command::Declinejoin].endpoint(join::declinejoin_command))
        // Members
        .branch(case![Command::Kick].endpoint(members::kick_command))
        .branch(case![Command::Block].endpoint(members::block_command))
        .branch(case![Command::Mute].endpoint(restrict::mute_command))
        .branch(case![Command::Unmute].endpoint(restrict::unmute_command))
        .branch(case![Command::Lock].endpoint(restrict::lock_command))
        .branch(case![Command::Unlock].endpoint(restrict::unlock_command))
}

async fn handle_help(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    reply(&bot, &msg, Command::descriptions().to_string()).await
}

/// Reply to the command message.
pub(crate) async fn reply(
    bot: &ThrottledBot,
    msg: &Message,
    text: impl Into<String>,
) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, text)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Which admin right a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Right {
    RestrictMembers,
    InviteUsers,
}

/// Check that the command comes from a group admin with `right`.
///
/// Replies with the reason and returns `false` otherwise.
pub(crate) async fn ensure_admin(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    right: Right,
) -> anyhow::Result<bool> {
    if !msg.chat.is_group() && !msg.chat.is_supergroup() {
        reply(bot, msg, "This command only works in groups.").await?;
        return Ok(false);
    }

    let Some(user) = msg.from.as_ref() else {
        return Ok(false);
    };

    let allowed = match right {
        Right::RestrictMembers => state.permissions.can_restrict_members(msg.chat.id, user.id).await,
        Right::InviteUsers => state.permissions.can_invite_users(msg.chat.id, user.id).await,
    }
    .unwrap_or(false);

    if !allowed {
        debug!("User {} lacks {:?} in chat {}", user.id, right, msg.chat.id);
        reply(bot, msg, "You need admin rights to use this command.").await?;
    }
    Ok(allowed)
}

/// Capitalised list name for reply headers.
pub(crate) fn list_title(list: PolicyList) -> &'static str {
    match list {
        PolicyList::AcceptKeywords => "Join keywords",
        PolicyList::RejectKeywords => "Rejected keywords",
        PolicyList::RejectUserIds => "Blacklisted ids",
    }
}
