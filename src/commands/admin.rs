use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage,
};
use tracing::{info, warn};

use crate::db;
use crate::utils::embeds;
use crate::Context;

type Error = crate::error::Error;

const CLEAR_CONFIRM_ID: &str = "confirm_clear_database";

/// Vis gjeldande konfigurasjon (utan løyndomar).
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::require_opplysar"
)]
pub async fn konfig(ctx: Context<'_>) -> Result<(), Error> {
    let cfg = &ctx.data().config;

    fn channel(value: Option<serenity::all::ChannelId>) -> String {
        value.map(|id| format!("<#{id}>")).unwrap_or_else(|| "ikkje sett".into())
    }
    fn role(value: Option<serenity::all::RoleId>) -> String {
        value.map(|id| format!("<@&{id}>")).unwrap_or_else(|| "ikkje sett".into())
    }

    let embed = embeds::info_embed()
        .title("🔧 Konfigurasjon")
        .field("Prefiks", format!("`{}`", cfg.command_prefix), true)
        .field("Standardkanal", channel(cfg.default_channel_id), true)
        .field("Loggkanal", channel(cfg.log_channel_id), true)
        .field("Godkjenningskø", channel(cfg.approval.queue_channel_id), true)
        .field("Ordkø", channel(cfg.banned_words.approval_channel_id), true)
        .field("Grammatikkforum", channel(cfg.banned_words.grammar_channel_id), true)
        .field("Opplysar-rolle", role(cfg.approval.opplysar_role_id), true)
        .field("Rettskrivar-rolle", role(cfg.banned_words.rettskrivar_role_id), true)
        .field(
            "Stjernebrett",
            format!(
                "{} (terskel {}, {})",
                channel(cfg.starboard.channel_id),
                cfg.starboard.threshold,
                cfg.starboard.emoji
            ),
            false,
        )
        .field(
            "Planleggjar",
            format!(
                "{} — {} | morgon {} | kveld {} | inaktivitet {}t | nemner {}",
                if cfg.scheduler.enabled { "på" } else { "av" },
                cfg.scheduler.timezone,
                cfg.scheduler.morning_time.format("%H:%M"),
                cfg.scheduler.evening_time.format("%H:%M"),
                cfg.scheduler.inactivity.num_hours(),
                cfg.scheduler.mention.as_deref().unwrap_or("ingen")
            ),
            false,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Tøm databasen for alle data. Kan ikkje angrast; krev stadfesting.
#[poise::command(
    slash_command,
    prefix_command,
    rename = "tomdb",
    aliases("tømdb"),
    guild_only,
    check = "crate::commands::require_opplysar"
)]
pub async fn tomdb(ctx: Context<'_>) -> Result<(), Error> {
    let embed = embeds::error_embed()
        .title("🗑️ Stadfesting av databasetømming")
        .description(
            "Er du sikker på at du vil slette **alle** data frå databasen? Dette kan ikkje angrast.",
        );
    let components = vec![CreateActionRow::Buttons(vec![CreateButton::new(CLEAR_CONFIRM_ID)
        .label("Ja, slett alt!")
        .style(ButtonStyle::Danger)])];

    let reply = ctx
        .send(poise::CreateReply::default().embed(embed).components(components))
        .await?;
    let message = reply.message().await?;

    let interaction = message
        .await_component_interaction(&ctx.serenity_context().shard)
        .author_id(ctx.author().id)
        .timeout(std::time::Duration::from_secs(60))
        .await;

    match interaction {
        Some(press) if press.data.custom_id == CLEAR_CONFIRM_ID => {
            db::clear_all(&ctx.data().db).await?;
            info!(user = %ctx.author().name, "Database cleared");
            press
                .create_response(
                    ctx.http(),
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new().content("✅ Databasen er tømd."),
                    ),
                )
                .await?;
            let done = embeds::success_embed()
                .title("🗑️ Databasen er tømd")
                .description("Alle spørsmål, ord og stjernebrett-oppføringar er sletta.");
            reply
                .edit(ctx, poise::CreateReply::default().embed(done).components(vec![]))
                .await?;
        }
        _ => {
            let cancelled = embeds::info_embed()
                .title("Avbrote")
                .description("Databasen vart ikkje rørt.");
            reply
                .edit(ctx, poise::CreateReply::default().embed(cancelled).components(vec![]))
                .await?;
        }
    }

    Ok(())
}

/// Logg av boten og avslutt prosessen.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::require_opplysar"
)]
pub async fn loggav(ctx: Context<'_>) -> Result<(), Error> {
    info!(user = %ctx.author().name, "Shutdown requested");

    let embed = embeds::info_embed()
        .title("👋 Farvel")
        .description("Tyrihans loggar av.");
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    if let Some(log_channel) = ctx.data().config.log_channel_id {
        let embed = embeds::error_embed()
            .title("🔴 Offline")
            .description("Tyrihans loggar av. Farvel! 👋");
        if let Err(e) = log_channel
            .send_message(ctx.http(), CreateMessage::new().embed(embed))
            .await
        {
            warn!(error = %e, "Failed to send offline notice");
        }
    }

    ctx.framework().shard_manager.shutdown_all().await;
    Ok(())
}
