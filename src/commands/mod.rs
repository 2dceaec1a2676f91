pub mod admin;
pub mod general;
pub mod questions;
pub mod words;

use crate::approval;
use crate::error::Error;
use crate::{Context, Data};

/// Every command the framework registers, in help-listing order.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        general::ping(),
        general::hei(),
        general::info(),
        general::hjelp(),
        general::kjeften(),
        questions::spor(),
        questions::godkjenn(),
        questions::poke(),
        words::ord(),
        admin::konfig(),
        admin::tomdb(),
        admin::loggav(),
    ]
}

/// Poise check: moderator commands require the opplysar role. Fails
/// closed outside guilds and on lookup errors.
pub async fn require_opplysar(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(false);
    };
    let capability = approval::resolve_capability(
        ctx.serenity_context(),
        &ctx.data().config,
        guild_id,
        ctx.author().id,
    )
    .await;
    Ok(capability.has_opplysar())
}
