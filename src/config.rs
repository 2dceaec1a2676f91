use crate::error::Error;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serenity::all::{ChannelId, GuildId, RoleId};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub database_schema: String,
    pub command_prefix: String,
    pub guild_id: Option<GuildId>,
    pub log_channel_id: Option<ChannelId>,
    pub default_channel_id: Option<ChannelId>,
    pub approval: ApprovalConfig,
    pub banned_words: BannedWordsConfig,
    pub starboard: StarboardConfig,
    pub scheduler: SchedulerConfig,
    pub reactions: ReactionsConfig,
    pub bot_version: String,
}

/// Question approval queue.
#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    pub queue_channel_id: Option<ChannelId>,
    pub opplysar_role_id: Option<RoleId>,
}

/// Banned-word moderation: the dual-role approval queue and the
/// grammar forum where discussion threads are created.
#[derive(Debug, Clone)]
pub struct BannedWordsConfig {
    pub approval_channel_id: Option<ChannelId>,
    pub rettskrivar_role_id: Option<RoleId>,
    pub grammar_channel_id: Option<ChannelId>,
}

#[derive(Debug, Clone)]
pub struct StarboardConfig {
    pub channel_id: Option<ChannelId>,
    pub threshold: u64,
    pub emoji: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub timezone: Tz,
    pub morning_time: NaiveTime,
    pub evening_time: NaiveTime,
    pub inactivity: chrono::Duration,
    /// Prepended to scheduled sends, e.g. "@pratsam" or a role mention.
    pub mention: Option<String>,
}

/// Emojis the reaction dispatcher is wired to at startup.
#[derive(Debug, Clone)]
pub struct ReactionsConfig {
    pub question: String,
    pub approve: String,
    pub reject: String,
    pub report: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DISCORD_TOKEN` — Bot token from the Discord developer portal
    ///
    /// Optional (workflow features disable themselves when unset):
    /// - `DATABASE_URL` — Postgres connection string
    /// - `DATABASE_SCHEMA` — namespace for all tables (default "public")
    /// - `COMMAND_PREFIX` — prefix for text commands (default "!")
    /// - `GUILD_ID`, `LOG_CHANNEL_ID`, `DEFAULT_CHANNEL_ID`
    /// - `APPROVAL_QUEUE_CHANNEL_ID`, `OPPLYSAR_ROLE_ID`
    /// - `WORD_APPROVAL_CHANNEL_ID`, `RETTSKRIVAR_ROLE_ID`, `GRAMMAR_CHANNEL_ID`
    /// - `STARBOARD_CHANNEL_ID`, `STARBOARD_THRESHOLD`, `STARBOARD_EMOJI`
    /// - `SCHEDULER_ENABLED`, `SCHEDULER_TIMEZONE`, `SCHEDULER_MORNING_TIME`,
    ///   `SCHEDULER_EVENING_TIME`, `SCHEDULER_INACTIVITY_HOURS`, `SCHEDULER_MENTION`
    /// - `QUESTION_EMOJI`
    ///
    /// Malformed optional values fall back to defaults with a warning;
    /// only a missing token is fatal.
    pub fn from_env() -> Result<Self, Error> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .map_err(|_| Error::Config("DISCORD_TOKEN environment variable is required".into()))?;

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/tyrihans".into());
        let database_schema =
            std::env::var("DATABASE_SCHEMA").unwrap_or_else(|_| "public".into());
        let command_prefix = std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".into());

        Ok(Self {
            discord_token,
            database_url,
            database_schema,
            command_prefix,
            guild_id: parse_optional_id::<GuildId>("GUILD_ID")?,
            log_channel_id: parse_optional_id::<ChannelId>("LOG_CHANNEL_ID")?,
            default_channel_id: parse_optional_id::<ChannelId>("DEFAULT_CHANNEL_ID")?,
            approval: ApprovalConfig {
                queue_channel_id: parse_optional_id::<ChannelId>("APPROVAL_QUEUE_CHANNEL_ID")?,
                opplysar_role_id: parse_optional_id::<RoleId>("OPPLYSAR_ROLE_ID")?,
            },
            banned_words: BannedWordsConfig {
                approval_channel_id: parse_optional_id::<ChannelId>("WORD_APPROVAL_CHANNEL_ID")?,
                rettskrivar_role_id: parse_optional_id::<RoleId>("RETTSKRIVAR_ROLE_ID")?,
                grammar_channel_id: parse_optional_id::<ChannelId>("GRAMMAR_CHANNEL_ID")?,
            },
            starboard: StarboardConfig {
                channel_id: parse_optional_id::<ChannelId>("STARBOARD_CHANNEL_ID")?,
                threshold: parse_with_default("STARBOARD_THRESHOLD", 3),
                emoji: std::env::var("STARBOARD_EMOJI").unwrap_or_else(|_| "⭐".into()),
            },
            scheduler: SchedulerConfig::from_env(),
            reactions: ReactionsConfig {
                question: std::env::var("QUESTION_EMOJI").unwrap_or_else(|_| "❓".into()),
                approve: "👍".into(),
                reject: "👎".into(),
                report: "🔨".into(),
            },
            bot_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

impl SchedulerConfig {
    fn from_env() -> Self {
        let enabled = std::env::var("SCHEDULER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let timezone = match std::env::var("SCHEDULER_TIMEZONE") {
            Ok(tz) => tz.parse::<Tz>().unwrap_or_else(|_| {
                warn!(timezone = %tz, "Invalid SCHEDULER_TIMEZONE, falling back to UTC");
                Tz::UTC
            }),
            Err(_) => Tz::UTC,
        };

        Self {
            enabled,
            timezone,
            morning_time: parse_time_of_day("SCHEDULER_MORNING_TIME", NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
            evening_time: parse_time_of_day("SCHEDULER_EVENING_TIME", NaiveTime::from_hms_opt(20, 0, 0).unwrap()),
            inactivity: chrono::Duration::hours(parse_with_default("SCHEDULER_INACTIVITY_HOURS", 6)),
            mention: std::env::var("SCHEDULER_MENTION").ok().filter(|v| !v.is_empty()),
        }
    }
}

fn parse_optional_id<T>(var: &str) -> Result<Option<T>, Error>
where
    T: From<u64>,
{
    match std::env::var(var) {
        Ok(val) if !val.is_empty() => {
            let id = val
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("Invalid ID for {var}: '{val}'")))?;
            Ok(Some(T::from(id)))
        }
        _ => Ok(None),
    }
}

fn parse_with_default<T: std::str::FromStr + std::fmt::Display + Copy>(var: &str, default: T) -> T {
    match std::env::var(var) {
        Ok(val) if !val.is_empty() => val.trim().parse::<T>().unwrap_or_else(|_| {
            warn!(var, value = %val, fallback = %default, "Invalid value, using default");
            default
        }),
        _ => default,
    }
}

/// Parse an "HH:MM" time-of-day from the environment, with fallback.
fn parse_time_of_day(var: &str, default: NaiveTime) -> NaiveTime {
    match std::env::var(var) {
        Ok(val) if !val.is_empty() => NaiveTime::parse_from_str(val.trim(), "%H:%M")
            .unwrap_or_else(|_| {
                warn!(var, value = %val, "Invalid time of day (expected HH:MM), using default");
                default
            }),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_parses_and_falls_back() {
        std::env::set_var("TEST_MORNING_OK", "07:45");
        std::env::set_var("TEST_MORNING_BAD", "kvart på åtte");
        let default = NaiveTime::from_hms_opt(8, 0, 0).unwrap();

        assert_eq!(
            parse_time_of_day("TEST_MORNING_OK", default),
            NaiveTime::from_hms_opt(7, 45, 0).unwrap()
        );
        assert_eq!(parse_time_of_day("TEST_MORNING_BAD", default), default);
        assert_eq!(parse_time_of_day("TEST_MORNING_UNSET", default), default);
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc() {
        std::env::set_var("SCHEDULER_TIMEZONE", "Europe/Atlantis");
        let cfg = SchedulerConfig::from_env();
        assert_eq!(cfg.timezone, Tz::UTC);
        std::env::remove_var("SCHEDULER_TIMEZONE");
    }
}
