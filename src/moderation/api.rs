//! Moderation actions against the chat platform.
//!
//! The engines only decide. Whoever holds a [`ModerationApi`] carries the
//! decision out, which keeps the decision code testable without a network.

use std::future::Future;
use std::time::Duration;

/// A pending request to join a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub group: String,
    pub user: String,
    /// Free text the requester attached, if any.
    pub comment: Option<String>,
}

impl JoinRequest {
    pub fn new(group: impl Into<String>, user: impl Into<String>, comment: Option<String>) -> Self {
        Self {
            group: group.into(),
            user: user.into(),
            comment,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// Calls the moderation layer needs from the chat platform.
pub trait ModerationApi: Send + Sync {
    /// Silence a member for `duration`.
    fn mute(
        &self,
        group: &str,
        user: &str,
        duration: Duration,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Lift a mute.
    fn unmute(&self, group: &str, user: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Mute or unmute every non-admin member of a group at once.
    fn set_group_lock(
        &self,
        group: &str,
        locked: bool,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Remove a member. With `blacklist` the member cannot rejoin.
    fn kick(
        &self,
        group: &str,
        user: &str,
        blacklist: bool,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Answer a pending join request.
    fn respond_to_join_request(
        &self,
        request: &JoinRequest,
        approve: bool,
        reason: Option<&str>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Name to show for a member of a group.
    fn fetch_display_name(
        &self,
        group: &str,
        user: &str,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;

    /// Delete a message from a group.
    fn retract_message(
        &self,
        group: &str,
        message_id: i32,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Post a plain notice to a chat.
    fn notify(&self, chat: &str, text: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[cfg(test)]
pub mod testing {
    //! In-memory [`ModerationApi`] that records every call.

    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Action {
        Mute {
            group: String,
            user: String,
            duration: Duration,
        },
        Unmute {
            group: String,
            user: String,
        },
        Lock {
            group: String,
            locked: bool,
        },
        Kick {
            group: String,
            user: String,
            blacklist: bool,
        },
        Respond {
            group: String,
            user: String,
            approve: bool,
            reason: Option<String>,
        },
        Retract {
            group: String,
            message_id: i32,
        },
        Notify {
            chat: String,
            text: String,
        },
    }

    #[derive(Debug, Default)]
    pub struct RecordingApi {
        actions: Mutex<Vec<Action>>,
        names: HashMap<String, String>,
        fail_mutes: bool,
        fail_retracts: bool,
        fail_kicks: bool,
    }

    impl RecordingApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_name(mut self, user: &str, name: &str) -> Self {
            self.names.insert(user.to_string(), name.to_string());
            self
        }

        pub fn failing_mutes(mut self) -> Self {
            self.fail_mutes = true;
            self
        }

        pub fn failing_retracts(mut self) -> Self {
            self.fail_retracts = true;
            self
        }

        pub fn failing_kicks(mut self) -> Self {
            self.fail_kicks = true;
            self
        }

        pub fn actions(&self) -> Vec<Action> {
            self.actions.lock().clone()
        }

        pub fn notices(&self) -> Vec<(String, String)> {
            self.actions
                .lock()
                .iter()
                .filter_map(|a| match a {
                    Action::Notify { chat, text } => Some((chat.clone(), text.clone())),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, action: Action) {
            self.actions.lock().push(action);
        }
    }

    impl ModerationApi for RecordingApi {
        async fn mute(&self, group: &str, user: &str, duration: Duration) -> anyhow::Result<()> {
            if self.fail_mutes {
                anyhow::bail!("not enough rights to restrict members");
            }
            self.record(Action::Mute {
                group: group.to_string(),
                user: user.to_string(),
                duration,
            });
            Ok(())
        }

        async fn unmute(&self, group: &str, user: &str) -> anyhow::Result<()> {
            self.record(Action::Unmute {
                group: group.to_string(),
                user: user.to_string(),
            });
            Ok(())
        }

        async fn set_group_lock(&self, group: &str, locked: bool) -> anyhow::Result<()> {
            self.record(Action::Lock {
                group: group.to_string(),
                locked,
            });
            Ok(())
        }

        async fn kick(&self, group: &str, user: &str, blacklist: bool) -> anyhow::Result<()> {
            if self.fail_kicks {
                anyhow::bail!("not enough rights to ban members");
            }
            self.record(Action::Kick {
                group: group.to_string(),
                user: user.to_string(),
                blacklist,
            });
            Ok(())
        }

        async fn respond_to_join_request(
            &self,
            request: &JoinRequest,
            approve: bool,
            reason: Option<&str>,
        ) -> anyhow::Result<()> {
            self.record(Action::Respond {
                group: request.group.clone(),
                user: request.user.clone(),
                approve,
                reason: reason.map(str::to_string),
            });
            Ok(())
        }

        async fn fetch_display_name(&self, _group: &str, user: &str) -> anyhow::Result<String> {
            self.names
                .get(user)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("member {user} not found"))
        }

        async fn retract_message(&self, group: &str, message_id: i32) -> anyhow::Result<()> {
            if self.fail_retracts {
                anyhow::bail!("message can't be deleted");
            }
            self.record(Action::Retract {
                group: group.to_string(),
                message_id,
            });
            Ok(())
        }

        async fn notify(&self, chat: &str, text: &str) -> anyhow::Result<()> {
            self.record(Action::Notify {
                chat: chat.to_string(),
                text: text.to_string(),
            });
            Ok(())
        }
    }
}
