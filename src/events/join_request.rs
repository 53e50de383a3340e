//! Join request audit.
//!
//! Every request is announced (to the group or privately to the owners),
//! then decided by the moderation core. Undecided requests stay pending.

use futures::future::join_all;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::ChatJoinRequest;
use tracing::{debug, warn};

use crate::bot::dispatcher::AppState;
use crate::moderation::{AdminFacade, Decision, JoinRequest, ModerationApi};

/// Returns the handler for join requests.
pub fn handler() -> UpdateHandler<anyhow::Error> {
    Update::filter_chat_join_request().endpoint(join_request_handler)
}

async fn join_request_handler(request: ChatJoinRequest, state: AppState) -> anyhow::Result<()> {
    let join = JoinRequest::new(
        request.chat.id.0.to_string(),
        request.from.id.0.to_string(),
        request.bio.clone(),
    );

    process_join_request(
        &state.api,
        &state.admin,
        &state.owner_ids,
        &join,
        &request.from.full_name(),
    )
    .await?;
    Ok(())
}

/// Chats that receive audit notices for a group.
fn audit_targets(admin: &AdminFacade, owner_ids: &[u64], group: &str) -> Vec<String> {
    if admin.settings().audit_to_owners && !owner_ids.is_empty() {
        owner_ids.iter().map(u64::to_string).collect()
    } else {
        vec![group.to_string()]
    }
}

/// Send `text` to every target; failures are logged, not returned.
async fn broadcast<A: ModerationApi>(api: &A, targets: &[String], text: &str) {
    let results = join_all(targets.iter().map(|chat| api.notify(chat, text))).await;
    for (chat, result) in targets.iter().zip(results) {
        if let Err(e) = result {
            warn!("Failed to send join audit notice to {}: {}", chat, e);
        }
    }
}

fn audit_notice(name: &str, request: &JoinRequest) -> String {
    format!(
        "New join request\nName: {}\nID: {}\nComment: {}",
        name,
        request.user,
        request.comment().filter(|c| !c.is_empty()).unwrap_or("(none)")
    )
}

/// Announce and decide one request. Returns `None` when auditing is off.
pub async fn process_join_request<A: ModerationApi>(
    api: &A,
    admin: &AdminFacade,
    owner_ids: &[u64],
    request: &JoinRequest,
    fallback_name: &str,
) -> anyhow::Result<Option<Decision>> {
    if !admin.settings().join_audit {
        debug!(group = %request.group, "Join audit disabled, ignoring request");
        return Ok(None);
    }

    let name = match api.fetch_display_name(&request.group, &request.user).await {
        Ok(name) => name,
        Err(_) => fallback_name.to_string(),
    };

    let targets = audit_targets(admin, owner_ids, &request.group);
    broadcast(api, &targets, &audit_notice(&name, request)).await;

    let decision = admin.evaluate_join_request(request);
    let outcome = match decision {
        Decision::Reject(reason) => {
            api.respond_to_join_request(request, false, Some(reason.describe()))
                .await?;
            format!("{}, request auto-rejected", reason.describe())
        }
        Decision::Approve(_) => {
            api.respond_to_join_request(request, true, None).await?;
            "Verified, request auto-approved".to_string()
        }
        Decision::Indeterminate => return Ok(Some(decision)),
    };

    broadcast(api, &targets, &outcome).await;

    Ok(Some(decision))
}
