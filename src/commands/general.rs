use serenity::all::Mentionable;
use tracing::info;

use crate::db::banned_words::BannedWordRepository;
use crate::db::questions::QuestionRepository;
use crate::utils::embeds;
use crate::Context;

type Error = crate::error::Error;

/// Sjekk om boten svarar.
#[poise::command(slash_command, prefix_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let embed = embeds::success_embed()
        .title("Pong! 🏓")
        .description("Boten er oppe og svarar.");
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Sei hei til boten.
#[poise::command(slash_command, prefix_command, aliases("hallo"))]
pub async fn hei(ctx: Context<'_>) -> Result<(), Error> {
    let embed = embeds::info_embed()
        .title("Heisann! 👋")
        .description("Eg er Tyrihans! Eg samlar daglege spørsmål og passar på språket.");
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Syn opplysingar og statistikk om boten.
#[poise::command(slash_command, prefix_command)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let uptime = data.start_time.elapsed();
    let hours = uptime.as_secs() / 3600;
    let minutes = (uptime.as_secs() % 3600) / 60;

    let questions = QuestionRepository::stats(&data.db).await?;
    let words = BannedWordRepository::stats(&data.db).await?;

    let embed = embeds::info_embed()
        .title("📊 Om Tyrihans")
        .description("Discord-bot for daglege spørsmål, ordmoderering og stjernebrett.")
        .field("Versjon", &data.config.bot_version, true)
        .field("Oppetid", format!("{hours}t {minutes}m"), true)
        .field(
            "Spørsmål",
            format!(
                "{} ventar, {} godkjende, {} avviste",
                questions.pending, questions.approved, questions.rejected
            ),
            false,
        )
        .field(
            "Forbodne ord",
            format!(
                "{} ventar, {} halvvegs, {} godkjende, {} avviste",
                words.pending, words.opplysar_approved, words.fully_approved, words.rejected
            ),
            false,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List alle kommandoane.
#[poise::command(slash_command, prefix_command)]
pub async fn hjelp(
    ctx: Context<'_>,
    #[description = "Kommando du vil vite meir om"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Tyrihans — dagleg spørsmål og ordmoderering",
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

/// Slå av eller på «pratsam»-rolla for deg sjølv.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn kjeften(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| Error::InvalidState("Denne kommandoen må brukast i ein server.".into()))?;

    let roles = guild_id.roles(ctx.http()).await?;
    let Some((role_id, role)) = roles
        .iter()
        .find(|(_, role)| role.name.eq_ignore_ascii_case("pratsam"))
    else {
        let embed = embeds::error_embed()
            .title("Feil")
            .description("Fann ikkje rolla «pratsam» i serveren.");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    };

    // The bot's highest role must sit above the target role for the
    // add/remove calls to be allowed.
    let bot_id = ctx.serenity_context().cache.current_user().id;
    let bot_member = guild_id.member(ctx.http(), bot_id).await?;
    let bot_highest = bot_member
        .roles
        .iter()
        .filter_map(|id| roles.get(id))
        .map(|r| r.position)
        .max()
        .unwrap_or(0);
    if bot_highest <= role.position {
        let embed = embeds::error_embed().title("Feil").description(format!(
            "Botens rolle er ikkje høg nok til å endre rolla «{}». Flytt boten si rolle over henne i serverinnstillingane.",
            role.name
        ));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    let member = guild_id.member(ctx.http(), ctx.author().id).await?;
    if member.roles.contains(role_id) {
        member.remove_role(ctx.http(), *role_id).await?;
        info!(user = %ctx.author().id, "Removed pratsam role");
        let embed = embeds::success_embed()
            .title("Orsak! 🤐")
            .description("Eg visste ikkje at du ikkje var ein pratsam type. Eg skal late vere å plage deg.");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
    } else {
        member.add_role(ctx.http(), *role_id).await?;
        info!(user = %ctx.author().id, "Added pratsam role");
        let embed = embeds::success_embed()
            .title("Hei du! 📢")
            .description(format!(
                "Eg trur vi kjem til å verte gode venar, {}!",
                ctx.author().mention()
            ));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
    }

    Ok(())
}
