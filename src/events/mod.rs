//! Gateway event dispatch.
//!
//! Every event is handled in isolation: a failure is logged and never
//! propagates out of the dispatcher, so one guild's broken reaction
//! cannot take the consumer loop down with it.

pub mod registry;

use chrono::Utc;
use serenity::all::{
    Context as SerenityContext, CreateMessage, EditMessage, FullEvent, Message, Reaction,
    ReactionType,
};
use tracing::{debug, error, info, warn};

use crate::approval::{self, Capability};
use crate::db::banned_words::{self, BannedWordRepository, WordStatus};
use crate::db::questions::{QuestionRepository, QuestionStatus};
use crate::error::Error;
use crate::events::registry::ReactionKind;
use crate::starboard;
use crate::utils::embeds;
use crate::Data;

const REPORT_PROMPT_TITLE: &str = "🚨 Rapporter feil ord";

/// Entry point wired into the poise framework.
pub async fn handle_event(ctx: &SerenityContext, event: &FullEvent, data: &Data) {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!(bot = %data_about_bot.user.name, guilds = data_about_bot.guilds.len(), "Connected and ready");
            if let Some(log_channel) = data.config.log_channel_id {
                let embed = embeds::success_embed()
                    .title("🟢 Online")
                    .description("Tyrihans er klar! ✨");
                if let Err(e) = log_channel
                    .send_message(&ctx.http, CreateMessage::new().embed(embed))
                    .await
                {
                    warn!(error = %e, "Failed to send online notice");
                }
            }
        }
        FullEvent::Message { new_message } => {
            handle_message(ctx, data, new_message).await;
        }
        FullEvent::ReactionAdd { add_reaction } => {
            handle_reaction(ctx, data, add_reaction, false).await;
        }
        FullEvent::ReactionRemove { removed_reaction } => {
            handle_reaction(ctx, data, removed_reaction, true).await;
        }
        _ => {}
    }
}

// ─── Messages ────────────────────────────────────────────────────────

async fn handle_message(ctx: &SerenityContext, data: &Data, message: &Message) {
    if message.author.bot {
        return;
    }

    // Guild traffic is the scheduler's activity signal.
    if message.guild_id.is_some() {
        data.scheduler.lock().await.note_activity(Utc::now());
    }

    // Prefix commands are poise's job.
    if message.content.starts_with(&data.config.command_prefix) {
        return;
    }

    if is_report_reply(ctx, message) {
        if let Err(e) = process_word_report(ctx, data, message).await {
            error!(error = %e, "Word report processing failed");
        }
        return;
    }

    if let Err(e) = scan_for_banned_words(ctx, data, message).await {
        error!(error = %e, "Banned-word scan failed");
    }
}

/// A reply to our own report prompt carries the reported words.
fn is_report_reply(ctx: &SerenityContext, message: &Message) -> bool {
    let Some(referenced) = message.referenced_message.as_deref() else {
        return false;
    };
    referenced.author.id == ctx.cache.current_user().id
        && referenced
            .embeds
            .first()
            .and_then(|e| e.title.as_deref())
            .is_some_and(|title| title.contains(REPORT_PROMPT_TITLE))
}

async fn process_word_report(
    ctx: &SerenityContext,
    data: &Data,
    message: &Message,
) -> Result<(), Error> {
    let words = split_report_words(&message.content);
    if words.is_empty() {
        debug!("Report reply contained no usable words");
        return Ok(());
    }

    // The prompt's jump link points back at the flagged message.
    let origin = message
        .referenced_message
        .as_deref()
        .and_then(|m| m.embeds.first())
        .and_then(|e| e.description.as_deref())
        .and_then(parse_jump_link);

    let mut new_words = Vec::new();
    let mut existing_words = Vec::new();

    for word in &words {
        if BannedWordRepository::find_any(&data.db, word).await?.is_some() {
            existing_words.push(word.clone());
            continue;
        }

        let word_id = BannedWordRepository::add_pending(
            &data.db,
            word,
            "Rapportert med 🔨",
            &message.author.id.to_string(),
            &message.author.name,
            origin.as_ref().map(|(channel, _)| channel.as_str()),
            origin.as_ref().map(|(_, msg)| msg.as_str()),
        )
        .await?;
        new_words.push(word.clone());

        approval::post_word_to_queue(ctx, data, word_id).await?;
    }

    let mut text = match (new_words.is_empty(), existing_words.is_empty()) {
        (false, false) => format!(
            "Takk! Nye ord lagt til: {}. Finst allereie: {}",
            new_words.join(", "),
            existing_words.join(", ")
        ),
        (false, true) => format!(
            "Takk! Desse orda har blitt lagt til som forbodne: {}",
            new_words.join(", ")
        ),
        (true, false) => format!(
            "Alle orda finst allereie i lista over forbodne ord: {}",
            existing_words.join(", ")
        ),
        (true, true) => return Ok(()),
    };
    if !new_words.is_empty() {
        text.push_str("\n\nEi diskusjonstråd vert oppretta etter godkjenning.");
    }

    let embed = embeds::success_embed().title("Ord rapporterte").description(text);
    message
        .channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Warn when a message uses fully-approved banned words, linking their
/// discussion threads.
async fn scan_for_banned_words(
    ctx: &SerenityContext,
    data: &Data,
    message: &Message,
) -> Result<(), Error> {
    let mut seen = std::collections::HashSet::new();
    let mut hits = Vec::new();
    let mut threads = Vec::new();

    for token in message.content.split_whitespace() {
        let word = banned_words::normalize(token);
        if word.is_empty() || !seen.insert(word.clone()) {
            continue;
        }
        if let Some(banned) = BannedWordRepository::find_banned(&data.db, &word).await? {
            if let Some(thread) = banned.forum_thread_id {
                threads.push(format!("<#{thread}>"));
            }
            hits.push(word);
        }
    }

    if hits.is_empty() {
        return Ok(());
    }

    debug!(words = ?hits, author = %message.author.id, "Banned words detected in message");

    let mut text = format!("Ordet/orda **{}** står på lista over forbodne ord.", hits.join(", "));
    if !threads.is_empty() {
        text.push_str(&format!("\n\nSjå diskusjonen: {}", threads.join(", ")));
    }

    let embed = embeds::warning_embed().title("🚫 Ugrammatisk ord").description(text);
    message
        .channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new().embed(embed).reference_message(message),
        )
        .await?;
    Ok(())
}

// ─── Reactions ───────────────────────────────────────────────────────

async fn handle_reaction(ctx: &SerenityContext, data: &Data, reaction: &Reaction, removed: bool) {
    let Some(user_id) = reaction.user_id else {
        return;
    };
    if user_id == ctx.cache.current_user().id {
        return;
    }
    let Some(guild_id) = reaction.guild_id else {
        return;
    };

    let emoji = emoji_key(&reaction.emoji);
    let Some(entry) = data.reactions.get(&emoji).cloned() else {
        return;
    };
    if removed && !entry.handles_remove {
        return;
    }

    // Role-gated reactions: silently ignore members without any
    // moderation capability. A lookup failure also resolves to no
    // capability, never to an approval.
    let capability = if entry.admin_only {
        let capability =
            approval::resolve_capability(ctx, &data.config, guild_id, user_id).await;
        if capability == Capability::None {
            debug!(user = %user_id, emoji = %emoji, "Reaction from member without moderation role ignored");
            return;
        }
        capability
    } else {
        Capability::None
    };

    let result = match entry.kind {
        ReactionKind::Star => {
            starboard::handle_star_event(ctx, data, guild_id, reaction.channel_id, reaction.message_id)
                .await
        }
        ReactionKind::Question => submit_question_from_message(ctx, data, reaction).await,
        ReactionKind::ReportWord => send_report_prompt(ctx, reaction, guild_id).await,
        ReactionKind::Approve => {
            handle_approve_reaction(ctx, data, reaction, guild_id, capability).await
        }
        ReactionKind::Reject => handle_reject_reaction(ctx, data, reaction, capability).await,
    };

    if let Err(e) = result {
        match e {
            Error::InvalidState(msg) => debug!(emoji = %emoji, "{msg}"),
            Error::NotFound(what) => debug!(emoji = %emoji, target = %what, "Reaction target not tracked"),
            e => error!(emoji = %emoji, error = %e, "Reaction handling failed"),
        }
    }
}

/// Submit the reacted-to message as a question, confirm with ✅/❌.
async fn submit_question_from_message(
    ctx: &SerenityContext,
    data: &Data,
    reaction: &Reaction,
) -> Result<(), Error> {
    let message = reaction.channel_id.message(&ctx.http, reaction.message_id).await?;
    if message.content.trim().is_empty() || message.author.bot {
        return Ok(());
    }

    let stored = QuestionRepository::add(
        &data.db,
        &message.content,
        &message.author.id.to_string(),
        &message.author.name,
        Some(&message.id.to_string()),
        Some(&message.channel_id.to_string()),
    )
    .await;

    let question_id = match stored {
        Ok(id) => id,
        Err(e) => {
            let _ = reaction
                .channel_id
                .create_reaction(&ctx.http, reaction.message_id, ReactionType::Unicode("❌".into()))
                .await;
            return Err(e.into());
        }
    };

    approval::post_question_to_queue(ctx, data, question_id).await?;

    if let Err(e) = reaction
        .channel_id
        .create_reaction(&ctx.http, reaction.message_id, ReactionType::Unicode("✅".into()))
        .await
    {
        warn!(error = %e, "Failed to confirm question submission");
    }
    Ok(())
}

/// Ask the reporter which words in the flagged message are wrong.
async fn send_report_prompt(
    ctx: &SerenityContext,
    reaction: &Reaction,
    guild_id: serenity::all::GuildId,
) -> Result<(), Error> {
    // Confirm the message still exists before prompting.
    reaction.channel_id.message(&ctx.http, reaction.message_id).await?;

    info!(user = ?reaction.user_id, message = %reaction.message_id, "Word report started");

    let embed = embeds::error_embed()
        .title(REPORT_PROMPT_TITLE)
        .description(format!(
            "Ver snill og svar med ord som er feil, skilde med komma viss det er fleire.\n\n\
             [Hopp til opphavleg melding](https://discord.com/channels/{guild_id}/{}/{})",
            reaction.channel_id, reaction.message_id
        ));

    reaction
        .channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Approval vote: the message is either a banned-word queue entry (dual
/// consensus) or a question queue entry (single opplysar decision).
async fn handle_approve_reaction(
    ctx: &SerenityContext,
    data: &Data,
    reaction: &Reaction,
    guild_id: serenity::all::GuildId,
    capability: Capability,
) -> Result<(), Error> {
    let message_ref = reaction.message_id.to_string();

    if let Some(word) = BannedWordRepository::get_by_approval_message_id(&data.db, &message_ref).await? {
        if matches!(word.approval_status, WordStatus::FullyApproved | WordStatus::Rejected) {
            return Ok(());
        }
        return approval::handle_word_consensus(
            ctx,
            data,
            &word,
            guild_id,
            reaction.channel_id,
            reaction.message_id,
            &emoji_key(&reaction.emoji),
        )
        .await;
    }

    if let Some(question) = QuestionRepository::get_by_approval_message_id(&data.db, &message_ref).await? {
        // Question approval is an opplysar decision.
        if !capability.has_opplysar() {
            return Ok(());
        }
        if question.approval_status != QuestionStatus::Pending {
            return Ok(());
        }
        let Some(user_id) = reaction.user_id else {
            return Ok(());
        };
        return approval::approve_question(ctx, data, &question, user_id).await;
    }

    Err(Error::NotFound(format!("godkjenningsmelding {message_ref}")))
}

async fn handle_reject_reaction(
    ctx: &SerenityContext,
    data: &Data,
    reaction: &Reaction,
    capability: Capability,
) -> Result<(), Error> {
    if !capability.has_opplysar() {
        return Ok(());
    }
    let Some(user_id) = reaction.user_id else {
        return Ok(());
    };
    let message_ref = reaction.message_id.to_string();

    if let Some(word) = BannedWordRepository::get_by_approval_message_id(&data.db, &message_ref).await? {
        approval::reject_word(data, &word, user_id).await?;
        let embed = embeds::error_embed().title("❌ AVVIST").description(format!(
            "**Ord:** {}\n**Rapportert av:** {}\n**Avvist av:** <@{user_id}>",
            word.word, word.reporter_name
        ));
        if let Err(e) = reaction
            .channel_id
            .edit_message(&ctx.http, reaction.message_id, EditMessage::new().embed(embed))
            .await
        {
            warn!(word_id = word.id, error = %e, "Failed to render word rejection");
        }
        return Ok(());
    }

    if let Some(question) = QuestionRepository::get_by_approval_message_id(&data.db, &message_ref).await? {
        if question.approval_status != QuestionStatus::Pending {
            return Ok(());
        }
        return approval::reject_question(ctx, data, &question, user_id).await;
    }

    Err(Error::NotFound(format!("godkjenningsmelding {message_ref}")))
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn emoji_key(emoji: &ReactionType) -> String {
    match emoji {
        ReactionType::Unicode(name) => name.clone(),
        other => other.to_string(),
    }
}

/// Split a comma-separated word report into canonical, non-empty,
/// deduplicated words.
fn split_report_words(content: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    content
        .split(',')
        .map(banned_words::normalize)
        .filter(|w| !w.is_empty())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Extract (channel_id, message_id) from a Discord jump link embedded
/// in prompt text.
fn parse_jump_link(text: &str) -> Option<(String, String)> {
    const MARKER: &str = "https://discord.com/channels/";
    let start = text.find(MARKER)? + MARKER.len();
    let rest = &text[start..];
    let end = rest.find(|c: char| c == ')' || c.is_whitespace()).unwrap_or(rest.len());
    let mut parts = rest[..end].split('/');
    let _guild = parts.next()?;
    let channel = parts.next()?;
    let message = parts.next()?;
    if channel.is_empty() || message.is_empty() {
        return None;
    }
    Some((channel.to_string(), message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_words_are_normalized_and_deduplicated() {
        assert_eq!(
            split_report_words("Dett, dett , hvorfor!, , HVORFOR"),
            vec!["dett".to_string(), "hvorfor".to_string()]
        );
        assert!(split_report_words("  , ,, ").is_empty());
    }

    #[test]
    fn jump_links_parse_channel_and_message() {
        let text = "Sjå her: [Hopp til opphavleg melding](https://discord.com/channels/11/22/33)";
        assert_eq!(parse_jump_link(text), Some(("22".into(), "33".into())));
        assert_eq!(parse_jump_link("ingen lenkje her"), None);
        assert_eq!(parse_jump_link("https://discord.com/channels/11/22"), None);
    }

    #[test]
    fn custom_emojis_keep_their_full_key() {
        assert_eq!(emoji_key(&ReactionType::Unicode("⭐".into())), "⭐");
    }
}
