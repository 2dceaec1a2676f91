use tracing::info;

use crate::approval;
use crate::db::banned_words::{normalize, BannedWordRepository, WordStatus};
use crate::utils::embeds;
use crate::Context;

type Error = crate::error::Error;

/// Forbodne ord: rapportering og den stegvise godkjenninga.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands("rapporter", "godkjenn", "avvis", "liste"),
    subcommand_required
)]
pub async fn ord(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Rapporter eit ord som grammatisk feil.
#[poise::command(slash_command, prefix_command)]
pub async fn rapporter(
    ctx: Context<'_>,
    #[description = "Ordet som er feil"] word: String,
    #[description = "Kvifor ordet er feil"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let canonical = normalize(&word);
    if canonical.is_empty() {
        let embed = embeds::error_embed()
            .title("Feil")
            .description("Du må oppgje eit ord. Døme: `!ord rapporter dett`");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    if let Some(existing) = BannedWordRepository::find_any(&ctx.data().db, &canonical).await? {
        let embed = embeds::warning_embed().title("Ordet finst allereie").description(format!(
            "«{}» er alt rapportert (status: {}).",
            existing.word, existing.approval_status
        ));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    let word_id = BannedWordRepository::add_pending(
        &ctx.data().db,
        &canonical,
        reason.as_deref().unwrap_or(""),
        &ctx.author().id.to_string(),
        &ctx.author().name,
        None,
        None,
    )
    .await?;

    approval::post_word_to_queue(ctx.serenity_context(), ctx.data(), word_id).await?;

    let embed = embeds::success_embed().title("Ord rapportert").description(format!(
        "«{canonical}» er sendt til godkjenning hos opplysarane og rettskrivarane."
    ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    info!(word_id, word = %canonical, reporter = %ctx.author().name, "Word reported by command");
    Ok(())
}

/// Godkjenn eit rapportert ord; steget avheng av rolla di.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn godkjenn(
    ctx: Context<'_>,
    #[description = "ID-en til ordet"] id: i32,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| Error::InvalidState("Denne kommandoen må brukast i ein server.".into()))?;

    let capability = approval::resolve_capability(
        ctx.serenity_context(),
        &ctx.data().config,
        guild_id,
        ctx.author().id,
    )
    .await;
    if capability == approval::Capability::None {
        let embed = embeds::error_embed()
            .title("Manglar rolle")
            .description("Berre opplysarar og rettskrivarar kan godkjenne ord.");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    let word = BannedWordRepository::get_by_id(&ctx.data().db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("rapportert ord med ID {id}")))?;

    let new_status = approval::approve_word_stage(
        ctx.serenity_context(),
        ctx.data(),
        &word,
        guild_id,
        ctx.author().id,
        capability,
    )
    .await?;

    let description = match new_status {
        WordStatus::OpplysarApproved => format!(
            "«{}» har fått opplysar-godkjenning og ventar no på ein rettskrivar.",
            word.word
        ),
        WordStatus::FullyApproved => format!(
            "«{}» er fullt godkjent og står no på lista over forbodne ord.",
            word.word
        ),
        other => format!("«{}» har status {other}.", word.word),
    };
    let embed = embeds::success_embed().title("✅ Godkjent").description(description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Avvis eit rapportert ord som framleis ventar.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::require_opplysar"
)]
pub async fn avvis(
    ctx: Context<'_>,
    #[description = "ID-en til ordet"] id: i32,
) -> Result<(), Error> {
    let word = BannedWordRepository::get_by_id(&ctx.data().db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("rapportert ord med ID {id}")))?;

    approval::reject_word(ctx.data(), &word, ctx.author().id).await?;

    let embed = embeds::error_embed()
        .title("❌ Avvist")
        .description(format!("«{}» vart avvist.", word.word));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List alle rapporterte ord med status.
#[poise::command(slash_command, prefix_command)]
pub async fn liste(ctx: Context<'_>) -> Result<(), Error> {
    let words = BannedWordRepository::list_all(&ctx.data().db).await?;
    if words.is_empty() {
        let embed = embeds::info_embed()
            .title("Forbodne ord")
            .description("Ingen ord er rapporterte enno.");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    const MAX_LINES: usize = 25;
    let mut lines: Vec<String> = words
        .iter()
        .take(MAX_LINES)
        .map(|w| format!("`{}` «{}» — {}", w.id, w.word, w.approval_status))
        .collect();
    if words.len() > MAX_LINES {
        lines.push(format!("… og {} til", words.len() - MAX_LINES));
    }

    let embed = embeds::info_embed()
        .title("Forbodne ord")
        .description(lines.join("\n"));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
