use serenity::all::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};

/// Embed colors used across the bot.
pub struct Colors;

impl Colors {
    pub const INFO: u32 = 0x0099FF;
    pub const SUCCESS: u32 = 0x00FF7F;
    pub const WARNING: u32 = 0xFFD700;
    pub const ERROR: u32 = 0xFF4444;
    pub const DISCUSSION: u32 = 0xFF6B35;
    pub const STARBOARD: u32 = 0xFFD700;
}

/// Create a standard info embed (blue).
pub fn info_embed() -> CreateEmbed {
    base_embed(Colors::INFO)
}

/// Create a success-themed embed (green).
pub fn success_embed() -> CreateEmbed {
    base_embed(Colors::SUCCESS)
}

/// Create a warning-themed embed (gold).
pub fn warning_embed() -> CreateEmbed {
    base_embed(Colors::WARNING)
}

/// Create an error-themed embed (red).
pub fn error_embed() -> CreateEmbed {
    base_embed(Colors::ERROR)
}

/// Embed attributed to a member, with their avatar when known.
pub fn user_embed(name: &str, avatar_url: Option<String>) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new(name);
    if let Some(url) = avatar_url {
        author = author.icon_url(url);
    }
    CreateEmbed::default().author(author)
}

fn base_embed(color: u32) -> CreateEmbed {
    CreateEmbed::default()
        .color(color)
        .footer(CreateEmbedFooter::new("Tyrihans"))
        .timestamp(serenity::model::Timestamp::now())
}
