//! Target resolution for member commands.

use teloxide::types::{Message, UserId};

/// User a command targets: the replied-to sender, else a numeric id as
/// the first argument.
///
/// Returns the id and how many arguments the target consumed.
pub fn target_user(msg: &Message) -> Option<(UserId, usize)> {
    if let Some(reply) = msg.reply_to_message()
        && let Some(user) = &reply.from
    {
        return Some((user.id, 0));
    }

    msg.text()?
        .split_whitespace()
        .nth(1)?
        .parse::<u64>()
        .ok()
        .map(|id| (UserId(id), 1))
}
