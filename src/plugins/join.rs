//! Manual review of pending join requests.

use teloxide::prelude::*;
use tracing::info;

use super::{Right, ensure_admin, reply};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::moderation::{JoinRequest, ModerationApi};
use crate::utils::command_args;

/// `<user_id> [reason...]`
pub fn parse_review_args(args: &[&str]) -> Option<(u64, Option<String>)> {
    let (first, rest) = args.split_first()?;
    let user = first.parse::<u64>().ok()?;
    let reason = (!rest.is_empty()).then(|| rest.join(" "));
    Some((user, reason))
}

async fn review(bot: ThrottledBot, msg: Message, state: AppState, approve: bool) -> anyhow::Result<()> {
    if !ensure_admin(&bot, &msg, &state, Right::InviteUsers).await? {
        return Ok(());
    }

    let Some((user, reason)) = parse_review_args(&command_args(msg.text().unwrap_or(""))) else {
        let usage = if approve {
            "Usage: /acceptjoin <user_id>"
        } else {
            "Usage: /declinejoin <user_id> [reason]"
        };
        return reply(&bot, &msg, usage).await;
    };

    let request = JoinRequest::new(msg.chat.id.0.to_string(), user.to_string(), None);
    let reason = if approve { None } else { reason };

    let text = match state
        .api
        .respond_to_join_request(&request, approve, reason.as_deref())
        .await
    {
        Ok(()) => {
            info!(group = %request.group, user, approve, "Join request reviewed manually");
            match (approve, reason) {
                (true, _) => format!("Join request of {user} approved."),
                (false, Some(reason)) => format!("Join request of {user} declined: {reason}"),
                (false, None) => format!("Join request of {user} declined."),
            }
        }
        Err(e) => format!("Could not answer the join request of {user}: {e}"),
    };
    reply(&bot, &msg, text).await
}

/// Handle /acceptjoin.
pub async fn acceptjoin_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    review(bot, msg, state, true).await
}

/// Handle /declinejoin.
pub async fn declinejoin_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    review(bot, msg, state, false).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_review_args() {
        assert_eq!(parse_review_args(&["42"]), Some((42, None)));
        assert_eq!(
            parse_review_args(&["42", "no", "intro"]),
            Some((42, Some("no intro".to_string())))
        );
        assert_eq!(parse_review_args(&[]), None);
        assert_eq!(parse_review_args(&["@someone"]), None);
    }
}
