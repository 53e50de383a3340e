//! Moderation core: join admission, flood detection and word filtering.
//!
//! The engines are synchronous and platform-agnostic. The bot layer
//! turns the decisions into platform calls through [`ModerationApi`].

pub mod admission;
pub mod api;
mod facade;
pub mod flood;
pub mod forbidden;

pub use admission::Decision;
pub use api::{JoinRequest, ModerationApi};
pub use facade::AdminFacade;
pub use flood::ThrottleDecision;
pub use forbidden::ForbiddenHit;
