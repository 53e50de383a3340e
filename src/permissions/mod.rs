//! Admin checks for moderation commands.
//!
//! Rights come from the chat platform and are cached for a few minutes.
//! Bot owners (`OWNER_IDS`) pass every check in every chat.
//!
//! ```rust,ignore
//! let perms = Permissions::with_owners(bot.inner().clone(), config.owner_ids.clone());
//!
//! if perms.can_invite_users(chat_id, user_id).await? {
//!     // answer join requests
//! }
//! ```

mod checker;

pub use checker::Permissions;
