//! Join policy commands: keyword lists and the id blacklist.

use teloxide::prelude::*;
use tracing::error;

use super::{Right, ensure_admin, list_title, reply};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::PolicyList;
use crate::moderation::AdminFacade;
use crate::utils::command_args;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Add,
    Remove,
}

/// Apply an edit and describe the outcome.
///
/// The change is on disk by the time this returns.
pub fn edit_reply(
    admin: &AdminFacade,
    group: &str,
    list: PolicyList,
    edit: Edit,
    args: &[String],
) -> String {
    if args.is_empty() {
        return format!("Give one or more {list}, separated by spaces.");
    }

    let result = match edit {
        Edit::Add => admin.add_entries(group, list, args),
        Edit::Remove => admin.remove_entries(group, list, args),
    };

    match (edit, result) {
        (_, Err(e)) => {
            error!(group, %list, "Policy change not saved: {}", e);
            format!("Failed to save {list}, nothing was changed.")
        }
        (Edit::Add, Ok(changed)) if changed.is_empty() => {
            format!("All of these are already in {list}.")
        }
        (Edit::Add, Ok(changed)) => format!("Added to {list}: {}", changed.join(", ")),
        (Edit::Remove, Ok(changed)) if changed.is_empty() => {
            format!("None of these are in {list}.")
        }
        (Edit::Remove, Ok(changed)) => format!("Removed from {list}: {}", changed.join(", ")),
    }
}

/// Current entries of a list, one per line.
pub fn list_reply(admin: &AdminFacade, group: &str, list: PolicyList) -> String {
    let entries = admin.entries(group, list);
    if entries.is_empty() {
        return format!("No {list} configured for this group.");
    }

    let mut text = format!("{} ({}):", list_title(list), entries.len());
    for entry in entries {
        text.push_str("\n- ");
        text.push_str(&entry);
    }
    text
}

async fn edit_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    list: PolicyList,
    edit: Edit,
) -> anyhow::Result<()> {
    if !ensure_admin(&bot, &msg, &state, Right::RestrictMembers).await? {
        return Ok(());
    }

    let args: Vec<String> = command_args(msg.text().unwrap_or(""))
        .into_iter()
        .map(str::to_string)
        .collect();
    let group = msg.chat.id.0.to_string();

    let text = state
        .admin
        .commit(move |admin| edit_reply(admin, &group, list, edit, &args))
        .await?;
    reply(&bot, &msg, text).await
}

async fn list_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    list: PolicyList,
) -> anyhow::Result<()> {
    if !ensure_admin(&bot, &msg, &state, Right::RestrictMembers).await? {
        return Ok(());
    }
    let text = list_reply(&state.admin, &msg.chat.id.0.to_string(), list);
    reply(&bot, &msg, text).await
}

/// Handle /addkeyword.
pub async fn add_keyword_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    edit_command(bot, msg, state, PolicyList::AcceptKeywords, Edit::Add).await
}

/// Handle /delkeyword.
pub async fn del_keyword_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    edit_command(bot, msg, state, PolicyList::AcceptKeywords, Edit::Remove).await
}

/// Handle /keywords.
pub async fn keywords_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    list_command(bot, msg, state, PolicyList::AcceptKeywords).await
}

/// Handle /addblackword.
pub async fn add_blackword_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    edit_command(bot, msg, state, PolicyList::RejectKeywords, Edit::Add).await
}

/// Handle /delblackword.
pub async fn del_blackword_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    edit_command(bot, msg, state, PolicyList::RejectKeywords, Edit::Remove).await
}

/// Handle /blackwords.
pub async fn blackwords_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    list_command(bot, msg, state, PolicyList::RejectKeywords).await
}

/// Handle /blacklist.
pub async fn blacklist_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    edit_command(bot, msg, state, PolicyList::RejectUserIds, Edit::Add).await
}

/// Handle /unblacklist.
pub async fn unblacklist_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    edit_command(bot, msg, state, PolicyList::RejectUserIds, Edit::Remove).await
}

/// Handle /blacklisted.
pub async fn blacklisted_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    list_command(bot, msg, state, PolicyList::RejectUserIds).await
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use super::*;
    use crate::config::ModerationSettings;
    use crate::database::PolicyStore;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_edit_and_list_replies() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PolicyStore::load(dir.path().join("policy.json")));
        let admin = AdminFacade::new(store, ModerationSettings::default(), None);

        assert_eq!(
            edit_reply(&admin, "g", PolicyList::AcceptKeywords, Edit::Add, &[]),
            "Give one or more accept keywords, separated by spaces."
        );
        assert_eq!(
            edit_reply(&admin, "g", PolicyList::AcceptKeywords, Edit::Add, &args(&["rust", "ferris"])),
            "Added to accept keywords: rust, ferris"
        );
        assert_eq!(
            edit_reply(&admin, "g", PolicyList::AcceptKeywords, Edit::Add, &args(&["RUST"])),
            "All of these are already in accept keywords."
        );
        assert_eq!(
            list_reply(&admin, "g", PolicyList::AcceptKeywords),
            "Join keywords (2):\n- ferris\n- rust"
        );
        assert_eq!(
            edit_reply(&admin, "g", PolicyList::AcceptKeywords, Edit::Remove, &args(&["go"])),
            "None of these are in accept keywords."
        );
        assert_eq!(
            list_reply(&admin, "other", PolicyList::RejectUserIds),
            "No blacklisted ids configured for this group."
        );
    }

    #[test]
    fn test_failed_save_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let store = Arc::new(PolicyStore::load(blocker.join("policy.json")));
        let admin = AdminFacade::new(store, ModerationSettings::default(), None);

        assert_eq!(
            edit_reply(&admin, "g", PolicyList::RejectUserIds, Edit::Add, &args(&["1"])),
            "Failed to save blacklisted ids, nothing was changed."
        );
        assert!(admin.entries("g", PolicyList::RejectUserIds).is_empty());
    }
}
