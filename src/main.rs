//! Gatewarden - join admission and anti-flood moderation for Telegram groups.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - Durable per-group join policy (JSON file)
//! - `moderation` - Admission, flood and forbidden-word engines behind one facade
//! - `cache` - Moka caches for platform lookups
//! - `permissions` - Admin checking with caching
//! - `bot` - Dispatcher, runtime and the Telegram moderation adapter
//! - `plugins` - Admin commands
//! - `events` - Join requests, member updates and message checks
//! - `utils` - Utility functions

mod bot;
mod cache;
mod config;
mod database;
mod error;
mod events;
mod moderation;
mod permissions;
mod plugins;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use database::PolicyStore;
use moderation::AdminFacade;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the log filter is read.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gatewarden=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Gatewarden...");

    let config = Config::from_env()?;
    info!("Bot mode: {:?}", config.bot_mode);

    let store = Arc::new(PolicyStore::load(config.policy_path()));
    info!(
        path = %store.path().display(),
        groups = store.groups().len(),
        "Policy store ready"
    );

    // Throttle respects Telegram's rate limits:
    // - 30 messages per second globally
    // - 1 message per second to the same chat
    // - 20 messages per minute to the same group
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let admin = Arc::new(AdminFacade::new(
        store,
        config.moderation.clone(),
        Some(me.id.0.to_string()),
    ));
    info!(
        monitored = config.moderation.monitored_groups.len(),
        "Moderation core ready"
    );

    let dispatcher = bot::build_dispatcher(bot.clone(), admin, config.owner_ids.clone());
    bot::run(&config, bot, dispatcher).await
}
