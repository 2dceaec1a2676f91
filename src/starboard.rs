//! Starboard: mirror messages that cross the star threshold.
//!
//! The transport is authoritative for the count: every event re-fetches
//! the message and re-reads the reaction tally, so duplicate or
//! reordered events converge on the same outcome.

use serenity::all::{
    ChannelId, Context as SerenityContext, CreateMessage, EditMessage, GuildId, Message,
    MessageId, ReactionType,
};
use tracing::{info, warn};

use crate::db::starboard::{StarboardPost, StarboardRepository};
use crate::error::Error;
use crate::utils::embeds;
use crate::Data;

/// What one observation of (count, mapping) requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarboardAction {
    Post,
    Update,
    Remove,
    Noop,
}

/// Pure decision: same inputs always give the same action, and an
/// action that has already been applied decides into Update/Noop rather
/// than a duplicate Post/Remove.
pub fn decide(star_count: u64, threshold: u64, mapping_exists: bool) -> StarboardAction {
    match (star_count >= threshold, mapping_exists) {
        (true, false) => StarboardAction::Post,
        (true, true) => StarboardAction::Update,
        (false, true) => StarboardAction::Remove,
        (false, false) => StarboardAction::Noop,
    }
}

/// Handle a star-reaction add or remove event.
pub async fn handle_star_event(
    ctx: &SerenityContext,
    data: &Data,
    guild_id: GuildId,
    channel_id: ChannelId,
    message_id: MessageId,
) -> Result<(), Error> {
    let Some(starboard_channel) = data.config.starboard.channel_id else {
        return Ok(());
    };
    // Stars on the starboard itself do not count.
    if channel_id == starboard_channel {
        return Ok(());
    }

    let message = channel_id.message(&ctx.http, message_id).await?;
    let star_count = count_stars(&message, &data.config.starboard.emoji);
    let existing = StarboardRepository::get(&data.db, &message_id.to_string()).await?;

    let action = decide(star_count, data.config.starboard.threshold, existing.is_some());
    match (action, existing) {
        (StarboardAction::Post, _) => {
            let embed = starboard_embed(&message, guild_id, channel_id, star_count);
            let posted = starboard_channel
                .send_message(&ctx.http, CreateMessage::new().embed(embed))
                .await?;
            StarboardRepository::upsert(
                &data.db,
                &message_id.to_string(),
                &channel_id.to_string(),
                &posted.id.to_string(),
                star_count as i32,
            )
            .await?;
            info!(message_id = %message_id, stars = star_count, "Message added to starboard");
        }
        (StarboardAction::Update, Some(mapping)) => {
            edit_starboard_message(ctx, starboard_channel, &mapping, &message, guild_id, channel_id, star_count)
                .await;
            StarboardRepository::upsert(
                &data.db,
                &message_id.to_string(),
                &channel_id.to_string(),
                &mapping.starboard_message_id,
                star_count as i32,
            )
            .await?;
        }
        (StarboardAction::Remove, Some(mapping)) => {
            if let Ok(starboard_message_id) = mapping.starboard_message_id.parse::<u64>() {
                if let Err(e) = starboard_channel
                    .delete_message(&ctx.http, MessageId::new(starboard_message_id))
                    .await
                {
                    warn!(error = %e, "Failed to delete starboard message");
                }
            }
            StarboardRepository::delete(&data.db, &message_id.to_string()).await?;
            info!(message_id = %message_id, stars = star_count, "Message removed from starboard");
        }
        _ => {}
    }

    Ok(())
}

fn count_stars(message: &Message, emoji: &str) -> u64 {
    message
        .reactions
        .iter()
        .find(|r| matches!(&r.reaction_type, ReactionType::Unicode(name) if name == emoji))
        .map(|r| r.count)
        .unwrap_or(0)
}

async fn edit_starboard_message(
    ctx: &SerenityContext,
    starboard_channel: ChannelId,
    mapping: &StarboardPost,
    message: &Message,
    guild_id: GuildId,
    channel_id: ChannelId,
    star_count: u64,
) {
    let Ok(starboard_message_id) = mapping.starboard_message_id.parse::<u64>() else {
        warn!(id = %mapping.starboard_message_id, "Malformed starboard message ref");
        return;
    };
    let embed = starboard_embed(message, guild_id, channel_id, star_count);
    if let Err(e) = starboard_channel
        .edit_message(
            &ctx.http,
            MessageId::new(starboard_message_id),
            EditMessage::new().embed(embed),
        )
        .await
    {
        warn!(error = %e, "Failed to update starboard message");
    }
}

fn starboard_embed(
    message: &Message,
    guild_id: GuildId,
    channel_id: ChannelId,
    star_count: u64,
) -> serenity::all::CreateEmbed {
    let mut author = serenity::all::CreateEmbedAuthor::new(message.author.name.clone());
    if let Some(avatar) = message.author.avatar_url() {
        author = author.icon_url(avatar);
    }

    serenity::all::CreateEmbed::default()
        .author(author)
        .color(embeds::Colors::STARBOARD)
        .description(message.content.clone())
        .field(
            "Opphaveleg melding",
            format!(
                "[Hopp til melding](https://discord.com/channels/{guild_id}/{channel_id}/{})",
                message.id
            ),
            false,
        )
        .footer(serenity::all::CreateEmbedFooter::new(format!("⭐ {star_count}")))
        .timestamp(message.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_threshold_posts_once() {
        assert_eq!(decide(3, 3, false), StarboardAction::Post);
        // Re-processing the same observation after the mapping exists
        // edits in place instead of posting again.
        assert_eq!(decide(3, 3, true), StarboardAction::Update);
    }

    #[test]
    fn falling_below_threshold_removes_once() {
        assert_eq!(decide(2, 3, true), StarboardAction::Remove);
        assert_eq!(decide(2, 3, false), StarboardAction::Noop);
    }

    #[test]
    fn below_threshold_without_mapping_is_noop() {
        assert_eq!(decide(0, 3, false), StarboardAction::Noop);
        assert_eq!(decide(2, 3, false), StarboardAction::Noop);
    }

    #[test]
    fn repeated_observations_are_stable() {
        for (count, exists) in [(5, true), (1, false)] {
            let first = decide(count, 3, exists);
            let second = decide(count, 3, exists);
            assert_eq!(first, second);
        }
    }
}
