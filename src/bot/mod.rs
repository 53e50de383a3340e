//! Bot module: Telegram wiring around the moderation core.

pub mod api;
pub mod dispatcher;
mod runtime;
pub mod webhook;

pub use dispatcher::build_dispatcher;
pub use runtime::run;
