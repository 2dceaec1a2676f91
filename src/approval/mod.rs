//! The approval workflow engine.
//!
//! Questions move pending → approved/rejected on a single opplysar
//! decision. Banned words need both moderator roles and support two
//! routes to `fully_approved`: stage-by-stage transitions driven by
//! operator commands, and the combined consensus path driven by live
//! reaction tallies. Every transition is a state-guarded database write;
//! side effects (DMs, embed edits, thread creation) happen only after
//! the write wins, and their failures never roll the transition back.

pub mod consensus;
pub mod roles;

use serenity::all::{
    AutoArchiveDuration, ChannelId, Context as SerenityContext, CreateForumPost, CreateMessage,
    EditMessage, GuildId, MessageId, ReactionType, UserId,
};
use tracing::{error, info, warn};

use crate::approval::consensus::ApprovalState;
use crate::db::banned_words::{BannedWord, BannedWordRepository, WordStatus};
use crate::db::questions::{Question, QuestionRepository};
use crate::error::Error;
use crate::utils::embeds;
use crate::Data;

pub use consensus::tally;
pub use roles::{resolve_capability, Capability};

// ─── Questions ───────────────────────────────────────────────────────

/// Post a pending question to the approval queue and record the queue
/// message so later reactions can be traced back to the row.
pub async fn post_question_to_queue(
    ctx: &SerenityContext,
    data: &Data,
    question_id: i32,
) -> Result<(), Error> {
    let Some(queue_channel) = data.config.approval.queue_channel_id else {
        warn!("Approval queue channel not configured, question stays pending without a vote message");
        return Ok(());
    };

    let question = QuestionRepository::get_pending_by_id(&data.db, question_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("ventande spørsmål {question_id}")))?;

    let embed = embeds::warning_embed()
        .title(question.question.clone())
        .description("⏳ Opplysar-godkjenning: ventar")
        .author(submitter_author(ctx, &question.author_id, &question.author_name).await);

    let message = queue_channel
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;

    // Seed the vote so approvers only have to click.
    if let Err(e) = queue_channel
        .create_reaction(
            &ctx.http,
            message.id,
            ReactionType::Unicode(data.config.reactions.approve.clone()),
        )
        .await
    {
        warn!(error = %e, "Failed to seed approval reaction");
    }

    QuestionRepository::set_approval_message_id(&data.db, question.id, &message.id.to_string())
        .await?;

    info!(question_id = question.id, message_id = %message.id, "Question posted to approval queue");
    Ok(())
}

/// pending → approved. The conditional write decides the winner under
/// concurrent reactions; the loser sees `InvalidState`.
pub async fn approve_question(
    ctx: &SerenityContext,
    data: &Data,
    question: &Question,
    approver: UserId,
) -> Result<(), Error> {
    let won = QuestionRepository::approve(&data.db, question.id, &approver.to_string()).await?;
    if !won {
        return Err(Error::InvalidState(format!(
            "Spørsmål {} er ikkje lenger til godkjenning.",
            question.id
        )));
    }

    notify_submitter_approved(ctx, question, approver).await;
    render_question_terminal(ctx, data, question, approver, true).await;
    Ok(())
}

/// pending → rejected, mirror of [`approve_question`].
pub async fn reject_question(
    ctx: &SerenityContext,
    data: &Data,
    question: &Question,
    rejector: UserId,
) -> Result<(), Error> {
    let won = QuestionRepository::reject(&data.db, question.id, &rejector.to_string()).await?;
    if !won {
        return Err(Error::InvalidState(format!(
            "Spørsmål {} er ikkje lenger til godkjenning.",
            question.id
        )));
    }

    notify_submitter_rejected(ctx, question, rejector).await;
    render_question_terminal(ctx, data, question, rejector, false).await;
    Ok(())
}

/// Edit the queue message into its terminal rendering. Transport
/// failure here is soft: the durable state already transitioned.
async fn render_question_terminal(
    ctx: &SerenityContext,
    data: &Data,
    question: &Question,
    actor: UserId,
    approved: bool,
) {
    let Some(queue_channel) = data.config.approval.queue_channel_id else {
        return;
    };
    let Some(message_id) = question
        .approval_message_id
        .as_deref()
        .and_then(|id| id.parse::<u64>().ok())
    else {
        return;
    };

    let embed = if approved {
        embeds::success_embed()
            .title(question.question.clone())
            .description(format!("🧘‍♀️ Opplysar-godkjenning: <@{actor}>"))
    } else {
        embeds::error_embed().title("❌ AVVIST").description(format!(
            "**Spørsmål:** {}\n**Frå:** {}\n**Avvist av:** <@{actor}>",
            question.question, question.author_name
        ))
    };

    if let Err(e) = queue_channel
        .edit_message(&ctx.http, MessageId::new(message_id), EditMessage::new().embed(embed))
        .await
    {
        warn!(question_id = question.id, error = %e, "Failed to update approval-queue message");
    }
}

async fn notify_submitter_approved(ctx: &SerenityContext, question: &Question, approver: UserId) {
    let text = format!(
        "Spørsmålet ditt er vorte godkjent av <@{approver}>!\n\n**\"{}\"**\n\nDet er no tilgjengeleg for daglege spørsmål! ✨",
        question.question
    );
    send_dm(ctx, &question.author_id, embeds::success_embed().title("🎉 Gratulerer! 🎉").description(text)).await;
}

async fn notify_submitter_rejected(ctx: &SerenityContext, question: &Question, rejector: UserId) {
    let text = format!(
        "Spørsmålet ditt har blitt avvist av <@{rejector}>.\n\n**\"{}\"**\n\nDu kan prøve å sende inn eit anna spørsmål som passar betre.",
        question.question
    );
    send_dm(ctx, &question.author_id, embeds::error_embed().title("❌ Spørsmål avvist").description(text)).await;
}

/// DM helper; failure (closed DMs, unknown user) is logged and dropped.
pub(crate) async fn send_dm(ctx: &SerenityContext, user_id: &str, embed: serenity::all::CreateEmbed) {
    let Ok(id) = user_id.parse::<u64>() else {
        warn!(user_id, "Malformed user id, skipping DM");
        return;
    };
    let user = UserId::new(id);
    match user.create_dm_channel(&ctx.http).await {
        Ok(channel) => {
            if let Err(e) = channel
                .id
                .send_message(&ctx.http, CreateMessage::new().embed(embed))
                .await
            {
                warn!(user = %user, error = %e, "Failed to send DM");
            }
        }
        Err(e) => warn!(user = %user, error = %e, "Failed to open DM channel"),
    }
}

// ─── Banned words ────────────────────────────────────────────────────

/// Post a pending word to the moderation queue with both stages shown
/// as waiting, and record the queue message ref.
pub async fn post_word_to_queue(
    ctx: &SerenityContext,
    data: &Data,
    word_id: i32,
) -> Result<(), Error> {
    let Some(channel) = data.config.banned_words.approval_channel_id else {
        warn!("Word approval channel not configured, word stays pending without a vote message");
        return Ok(());
    };

    let word = BannedWordRepository::get_by_id(&data.db, word_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("rapportert ord {word_id}")))?;

    let embed = embeds::warning_embed()
        .title(word.word.clone())
        .description(ApprovalState::default().summary())
        .author(submitter_author(ctx, &word.reporter_id, &word.reporter_name).await);

    let message = channel
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;

    if let Err(e) = channel
        .create_reaction(
            &ctx.http,
            message.id,
            ReactionType::Unicode(data.config.reactions.approve.clone()),
        )
        .await
    {
        warn!(error = %e, "Failed to seed approval reaction");
    }

    BannedWordRepository::set_approval_message_id(&data.db, word.id, &message.id.to_string())
        .await?;

    info!(word_id = word.id, word = %word.word, message_id = %message.id, "Word posted to moderation queue");
    Ok(())
}

/// Combined-consensus step, run on every qualifying reaction: recompute
/// the tally and either complete the approval or re-render partial
/// progress without touching durable state.
pub async fn handle_word_consensus(
    ctx: &SerenityContext,
    data: &Data,
    word: &BannedWord,
    guild_id: GuildId,
    channel_id: ChannelId,
    message_id: MessageId,
    emoji: &str,
) -> Result<(), Error> {
    let state = consensus::tally(ctx, &data.config, guild_id, channel_id, message_id, emoji).await?;

    if state.is_fully_approved() {
        let transitioned = complete_word_approval(data, word, &state).await?;
        if transitioned {
            create_discussion_thread(ctx, data, word.id, guild_id).await;
        }
        render_word_progress(ctx, channel_id, message_id, word, &state, true).await;
        info!(word_id = word.id, word = %word.word, "Word fully approved through consensus");
    } else {
        // One capability satisfied at most: show progress, persist nothing.
        render_word_progress(ctx, channel_id, message_id, word, &state, false).await;
        info!(word_id = word.id, word = %word.word, "Partial approval, waiting for remaining role");
    }

    Ok(())
}

/// Apply the terminal write for a complete consensus. From `pending`
/// this is the one-shot combined write recording every qualifying
/// reactor; a word already `opplysar_approved` (sequential stage A
/// happened first) converges through the stage-B write instead. Both
/// end on the same terminal fields. Returns whether this call moved the
/// row into `fully_approved`.
async fn complete_word_approval(
    data: &Data,
    word: &BannedWord,
    state: &ApprovalState,
) -> Result<bool, Error> {
    let opplysar: Vec<String> = state.opplysar_approvers.iter().map(|u| u.to_string()).collect();
    let rettskrivar: Vec<String> =
        state.rettskrivar_approvers.iter().map(|u| u.to_string()).collect();

    if BannedWordRepository::approve_combined(&data.db, word.id, &opplysar, &rettskrivar).await? {
        return Ok(true);
    }

    // Not pending any more; finish the sequential path if stage A is done.
    if let Some(first_rettskrivar) = rettskrivar.first() {
        if BannedWordRepository::approve_by_rettskrivar(&data.db, word.id, first_rettskrivar).await? {
            return Ok(true);
        }
    }

    // Already terminal (a concurrent event won); nothing to apply.
    Ok(false)
}

/// Sequential command path: which stage applies is decided by the
/// caller's capability and the row's current state, and each stage is
/// still guarded by the conditional write.
pub async fn approve_word_stage(
    ctx: &SerenityContext,
    data: &Data,
    word: &BannedWord,
    guild_id: GuildId,
    actor: UserId,
    capability: Capability,
) -> Result<WordStatus, Error> {
    match (word.approval_status, capability) {
        (WordStatus::Pending, c) if c.has_opplysar() => {
            let won =
                BannedWordRepository::approve_by_opplysar(&data.db, word.id, &actor.to_string())
                    .await?;
            if !won {
                return Err(stale_word_error(word));
            }
            Ok(WordStatus::OpplysarApproved)
        }
        (WordStatus::OpplysarApproved, c) if c.has_rettskrivar() => {
            let won =
                BannedWordRepository::approve_by_rettskrivar(&data.db, word.id, &actor.to_string())
                    .await?;
            if !won {
                return Err(stale_word_error(word));
            }
            create_discussion_thread(ctx, data, word.id, guild_id).await;
            Ok(WordStatus::FullyApproved)
        }
        (WordStatus::Pending, _) => Err(Error::InvalidState(
            "Ordet ventar på opplysar-godkjenning; den må kome frå ein opplysar.".into(),
        )),
        (WordStatus::OpplysarApproved, _) => Err(Error::InvalidState(
            "Ordet ventar på rettskrivar-godkjenning; den må kome frå ein rettskrivar.".into(),
        )),
        (status, _) => Err(Error::InvalidState(format!(
            "Ordet «{}» er allereie ferdigbehandla ({status}).",
            word.word
        ))),
    }
}

/// pending → rejected, opplysar-gated at the call sites.
pub async fn reject_word(data: &Data, word: &BannedWord, rejector: UserId) -> Result<(), Error> {
    let won = BannedWordRepository::reject(&data.db, word.id, &rejector.to_string()).await?;
    if !won {
        return Err(stale_word_error(word));
    }
    Ok(())
}

fn stale_word_error(word: &BannedWord) -> Error {
    Error::InvalidState(format!(
        "Ordet «{}» har alt endra status; ingen endring gjort.",
        word.word
    ))
}

/// One-time discussion-thread creation after full approval. Re-fetches
/// the row and checks `forum_thread_id` first so repeated triggers never
/// create a second thread, and a creation failure (forums can require
/// manual platform approval) leaves the ref null for a later retry
/// without disturbing the approval itself.
pub async fn create_discussion_thread(
    ctx: &SerenityContext,
    data: &Data,
    word_id: i32,
    guild_id: GuildId,
) {
    let Some(grammar_channel) = data.config.banned_words.grammar_channel_id else {
        warn!("Grammar channel not configured, skipping discussion thread");
        return;
    };

    let word = match BannedWordRepository::get_by_id(&data.db, word_id).await {
        Ok(Some(word)) => word,
        Ok(None) => {
            error!(word_id, "Word vanished before thread creation");
            return;
        }
        Err(e) => {
            error!(word_id, error = %e, "Failed to re-fetch word before thread creation");
            return;
        }
    };

    if word.forum_thread_id.is_some() {
        return;
    }

    let origin = match (&word.original_channel_id, &word.original_message_id) {
        (Some(channel), Some(message)) => format!(
            "[Hopp til opphavleg melding](https://discord.com/channels/{guild_id}/{channel}/{message})"
        ),
        (None, Some(message)) => format!("Meldings-ID: `{message}`"),
        _ => "Informasjon om opphavleg melding ikkje tilgjengeleg".to_string(),
    };

    let embed = embeds::info_embed()
        .color(embeds::Colors::DISCUSSION)
        .title(format!("📝 Grammatikkdiskusjon: {}", word.word))
        .description("Dette ordet har vorte rapportert som grammatisk feil.")
        .field("📍 Opphavleg melding", origin, false)
        .field(
            "💡 Diskusjonsrettleiing",
            "• Forklar kvifor ordet er feil\n• Gje korrekte alternativ\n• Del relevante reglar eller kjelder",
            false,
        );

    let post = CreateForumPost::new(
        word.word.clone(),
        CreateMessage::new().content("🔨 Grammatikkdiskusjon").embed(embed),
    )
    .auto_archive_duration(AutoArchiveDuration::OneHour);

    match grammar_channel.create_forum_post(&ctx.http, post).await {
        Ok(thread) => {
            info!(word_id = word.id, thread_id = %thread.id, "Created discussion thread");
            if let Err(e) =
                BannedWordRepository::set_forum_thread_id(&data.db, word.id, &thread.id.to_string())
                    .await
            {
                error!(word_id = word.id, error = %e, "Failed to record discussion thread ref");
            }
        }
        Err(e) => {
            // Approval stands; the thread can be retried later.
            warn!(word_id = word.id, error = %e, "Failed to create discussion thread (may require manual approval)");
        }
    }
}

/// Re-render the moderation-queue embed with current progress.
async fn render_word_progress(
    ctx: &SerenityContext,
    channel_id: ChannelId,
    message_id: MessageId,
    word: &BannedWord,
    state: &ApprovalState,
    complete: bool,
) {
    let color = if complete {
        embeds::Colors::SUCCESS
    } else {
        embeds::Colors::WARNING
    };

    let embed = embeds::user_embed(&word.reporter_name, None)
        .color(color)
        .title(word.word.clone())
        .description(state.summary());

    if let Err(e) = channel_id
        .edit_message(&ctx.http, message_id, EditMessage::new().embed(embed))
        .await
    {
        warn!(word_id = word.id, error = %e, "Failed to update word approval message");
    }
}

/// Embed author block for the submitter, with avatar when resolvable.
async fn submitter_author(
    ctx: &SerenityContext,
    user_id: &str,
    fallback_name: &str,
) -> serenity::all::CreateEmbedAuthor {
    if let Ok(id) = user_id.parse::<u64>() {
        if let Ok(user) = UserId::new(id).to_user(&ctx.http).await {
            let mut author = serenity::all::CreateEmbedAuthor::new(user.name.clone());
            if let Some(avatar) = user.avatar_url() {
                author = author.icon_url(avatar);
            }
            return author;
        }
    }
    serenity::all::CreateEmbedAuthor::new(fallback_name.to_string())
}
