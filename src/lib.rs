pub mod approval;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod starboard;
pub mod utils;

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::events::registry::ReactionRegistry;
use crate::scheduler::SchedulerState;

/// Shared data accessible across all Poise commands and event handlers.
pub struct Data {
    pub db: PgPool,
    pub config: config::Config,
    pub reactions: ReactionRegistry,
    pub scheduler: Arc<Mutex<SchedulerState>>,
    pub start_time: std::time::Instant,
}

/// Poise context alias used throughout the bot.
pub type Context<'a> = poise::Context<'a, Data, error::Error>;
