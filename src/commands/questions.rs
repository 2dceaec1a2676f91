use tracing::{info, warn};

use crate::approval;
use crate::db::questions::{Question, QuestionRepository};
use crate::scheduler::{self, MentionTarget};
use crate::utils::embeds;
use crate::Context;

type Error = crate::error::Error;

/// What a `godkjenn` invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GodkjennTarget {
    All,
    Next,
    Id(i32),
}

fn parse_godkjenn_target(arg: &str) -> Option<GodkjennTarget> {
    match arg.trim() {
        "alle" => Some(GodkjennTarget::All),
        "neste" | "next" => Some(GodkjennTarget::Next),
        other => other.parse::<i32>().ok().map(GodkjennTarget::Id),
    }
}

/// Legg til eit spørsmål for daglege spørsmål.
#[poise::command(slash_command, prefix_command, aliases("spør"))]
pub async fn spor(
    ctx: Context<'_>,
    #[description = "Spørsmålet du vil stille"]
    #[rest]
    question: String,
) -> Result<(), Error> {
    let question = question.trim().to_string();
    if question.is_empty() {
        let embed = embeds::error_embed()
            .title("❓ Feil")
            .description("Du må skrive eit spørsmål! Døme: `!spor Kva er din yndlingsmat?`");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    let embed = embeds::info_embed().title("📝 Spørsmål motteke!").description(format!(
        "Takk! Spørsmålet ditt er sendt til godkjenning: «{question}»\n\n\
         *Du får ei melding når det vert godkjent av opplysarane våre! ✨*"
    ));
    let reply = ctx.send(poise::CreateReply::default().embed(embed)).await?;
    let confirmation = reply.message().await?;

    let question_id = QuestionRepository::add(
        &ctx.data().db,
        &question,
        &ctx.author().id.to_string(),
        &ctx.author().name,
        Some(&confirmation.id.to_string()),
        Some(&ctx.channel_id().to_string()),
    )
    .await?;

    let dm = embeds::info_embed().title("📝 Spørsmål motteke!").description(format!(
        "Hei {}! 👋\n\nSpørsmålet ditt er vorte sendt til godkjenning:\n\n**«{question}»**\n\n\
         Du får bod når det vert godkjent av opplysarane våre! 📝✨",
        ctx.author().name
    ));
    approval::send_dm(ctx.serenity_context(), &ctx.author().id.to_string(), dm).await;

    approval::post_question_to_queue(ctx.serenity_context(), ctx.data(), question_id).await?;

    info!(question_id, author = %ctx.author().name, "Question submitted");
    Ok(())
}

/// Godkjenn eit ventande spørsmål: med ID, «neste» eller «alle».
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::require_opplysar"
)]
pub async fn godkjenn(
    ctx: Context<'_>,
    #[description = "Spørsmåls-ID, «neste» eller «alle»"]
    #[rest]
    target: String,
) -> Result<(), Error> {
    let Some(target) = parse_godkjenn_target(&target) else {
        let embed = embeds::error_embed()
            .title("❓ Feil")
            .description("Bruk: `godkjenn <ID>`, `godkjenn neste` eller `godkjenn alle`.");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    };

    let question = match target {
        GodkjennTarget::All => {
            // Bulk housekeeping: transitions every pending row and skips
            // the per-question DMs on purpose.
            let count =
                QuestionRepository::approve_all_pending(&ctx.data().db, &ctx.author().id.to_string())
                    .await?;
            let embed = embeds::success_embed()
                .title("✅ Alle godkjende")
                .description(format!("{count} ventande spørsmål er no godkjende."));
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            return Ok(());
        }
        GodkjennTarget::Next => {
            let Some(question) = QuestionRepository::get_next_pending(&ctx.data().db).await? else {
                let embed = embeds::success_embed()
                    .title("Ingen ventande spørsmål! 🎉")
                    .description("Godkjenningskøa er tom.");
                ctx.send(poise::CreateReply::default().embed(embed)).await?;
                return Ok(());
            };
            question
        }
        GodkjennTarget::Id(id) => QuestionRepository::get_pending_by_id(&ctx.data().db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("ventande spørsmål med ID {id}")))?,
    };

    approval::approve_question(ctx.serenity_context(), ctx.data(), &question, ctx.author().id)
        .await?;

    let embed = embeds::success_embed().title("✅ Spørsmål godkjent!").description(format!(
        "**Spørsmål:** {}\n**Frå:** {}\n**Godkjent av:** {}",
        question.question,
        question.author_name,
        ctx.author().name
    ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Utløys dagens spørsmål for hand. «poke alle» varslar @everyone.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "crate::commands::require_opplysar"
)]
pub async fn poke(
    ctx: Context<'_>,
    #[description = "«alle» for å varsle heile serveren"] alle: Option<String>,
) -> Result<(), Error> {
    let mention = if alle.as_deref().map(str::trim) == Some("alle") {
        MentionTarget::Everyone
    } else {
        MentionTarget::Submitter
    };

    info!(user = %ctx.author().name, ?mention, "Manual daily question trigger");

    // Same selection/increment/dispatch path as the scheduled trigger.
    let sent = scheduler::send_daily_question(
        ctx.http(),
        &ctx.data().db,
        &ctx.data().config,
        mention,
    )
    .await?;

    let Some(question) = sent else {
        let embed = embeds::warning_embed()
            .title("😔 Ingen godkjende spørsmål")
            .description("Ingen godkjende spørsmål er tilgjengelege for augneblinken.");
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    };

    // A manual send still counts as today's post.
    {
        let mut state = ctx.data().scheduler.lock().await;
        let now = chrono::Utc::now();
        state.last_daily_post = Some(now);
        state.last_activity = now;
    }

    confirm_poke(&ctx, &question).await;
    Ok(())
}

/// Post usage statistics to the log channel after a manual trigger.
async fn confirm_poke(ctx: &Context<'_>, question: &Question) {
    let embed = embeds::success_embed()
        .title("👉 Dagens spørsmål sendt")
        .description(format!("«{}»", question.question));
    if let Err(e) = ctx.send(poise::CreateReply::default().embed(embed)).await {
        warn!(error = %e, "Failed to confirm poke");
    }

    let Some(log_channel) = ctx.data().config.log_channel_id else {
        return;
    };
    match QuestionRepository::stats(&ctx.data().db).await {
        Ok(stats) => {
            let embed = embeds::info_embed().title("📊 Statistikk").description(format!(
                "{} godkjende spørsmål, {} gonger stilte totalt, minst stilt: {} gonger",
                stats.approved, stats.total_asked, stats.min_asked
            ));
            if let Err(e) = log_channel
                .send_message(ctx.http(), serenity::all::CreateMessage::new().embed(embed))
                .await
            {
                warn!(error = %e, "Failed to send stats notice");
            }
        }
        Err(e) => warn!(error = %e, "Failed to fetch question stats"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn godkjenn_targets_parse() {
        assert_eq!(parse_godkjenn_target("alle"), Some(GodkjennTarget::All));
        assert_eq!(parse_godkjenn_target("neste"), Some(GodkjennTarget::Next));
        assert_eq!(parse_godkjenn_target("next"), Some(GodkjennTarget::Next));
        assert_eq!(parse_godkjenn_target(" 42 "), Some(GodkjennTarget::Id(42)));
        assert_eq!(parse_godkjenn_target("tull"), None);
        assert_eq!(parse_godkjenn_target(""), None);
    }
}
