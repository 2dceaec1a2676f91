//! Daily-question scheduling.
//!
//! A 30-minute tick loop decides from wall-clock time (in the configured
//! timezone) and an inactivity signal whether to send the next daily
//! question. The decision itself is a pure function; the fire action is
//! shared with the manual poke command so both paths select, count and
//! dispatch identically.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serenity::all::{CreateMessage, Http, UserId};
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{Config, SchedulerConfig};
use crate::db::questions::{Question, QuestionRepository};
use crate::error::Error;
use crate::utils::embeds;

const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30 * 60);

/// Process-local scheduler state, carried across ticks. Not persisted:
/// a restart simply waits for the next trigger window.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    /// Last observed qualifying user activity (fed by the message
    /// handler, consumed here).
    pub last_activity: DateTime<Utc>,
    /// Set only on an actual send; gates "already posted today".
    pub last_daily_post: Option<DateTime<Utc>>,
}

impl SchedulerState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_activity: now,
            last_daily_post: None,
        }
    }

    pub fn note_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Morning,
    Inactivity,
}

/// Outcome of one polling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fire(TriggerReason),
    Skip,
    /// Inactivity threshold met, but past the nighttime cutoff. The
    /// trigger is dropped, not carried into tomorrow.
    SuppressedPastEvening,
}

/// Pure per-tick decision, evaluated in the configured timezone.
/// At most one trigger per tick; the morning window wins ties.
pub fn evaluate(now: DateTime<Tz>, state: &SchedulerState, cfg: &SchedulerConfig) -> Decision {
    let now_time = now.time();
    let has_posted_today = state
        .last_daily_post
        .is_some_and(|post| post.with_timezone(&now.timezone()).date_naive() == now.date_naive());

    if has_posted_today {
        return Decision::Skip;
    }

    let morning_end = cfg
        .morning_time
        .overflowing_add_signed(Duration::minutes(30))
        .0;
    if now_time >= cfg.morning_time && now_time < morning_end {
        return Decision::Fire(TriggerReason::Morning);
    }

    let idle = now.with_timezone(&Utc) - state.last_activity;
    if idle >= cfg.inactivity {
        if now_time > cfg.morning_time && now_time < cfg.evening_time {
            return Decision::Fire(TriggerReason::Inactivity);
        }
        if now_time >= cfg.evening_time {
            return Decision::SuppressedPastEvening;
        }
    }

    Decision::Skip
}

/// Who gets mentioned alongside the daily question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionTarget {
    Nobody,
    Everyone,
    Submitter,
    /// The configured `SCHEDULER_MENTION`, used by the tick loop.
    Configured,
}

/// Select the least-used approved question, dispatch it, and count the
/// send. Used by both the tick loop and the manual poke command. An
/// empty backlog or missing destination channel is a logged skip, never
/// an error; the usage counter moves only after a successful send.
pub async fn send_daily_question(
    http: &Http,
    pool: &PgPool,
    config: &Config,
    mention: MentionTarget,
) -> Result<Option<Question>, Error> {
    let Some(channel_id) = config.default_channel_id else {
        warn!("No default channel configured, skipping daily question");
        return Ok(None);
    };

    let Some(question) = QuestionRepository::get_least_asked_approved(pool).await? else {
        info!("No approved questions available for the day");
        return Ok(None);
    };

    let content = match mention {
        MentionTarget::Nobody => String::new(),
        MentionTarget::Everyone => "@everyone".to_string(),
        MentionTarget::Submitter => format!("<@{}>", question.author_id),
        MentionTarget::Configured => config.scheduler.mention.clone().unwrap_or_default(),
    };

    let mut author = serenity::all::CreateEmbedAuthor::new(question.author_name.clone());
    if let Ok(id) = question.author_id.parse::<u64>() {
        if let Ok(user) = UserId::new(id).to_user(http).await {
            if let Some(avatar) = user.avatar_url() {
                author = serenity::all::CreateEmbedAuthor::new(user.name.clone()).icon_url(avatar);
            }
        }
    }

    let embed = embeds::info_embed()
        .title("🌅 Dagens spørsmål")
        .description(question.question.clone())
        .author(author);

    let mut message = CreateMessage::new().embed(embed);
    if !content.is_empty() {
        message = message.content(content);
    }
    channel_id.send_message(http, message).await?;

    QuestionRepository::increment_usage(pool, question.id).await?;

    info!(
        question_id = question.id,
        times_asked = question.times_asked + 1,
        "Daily question sent"
    );
    Ok(Some(question))
}

/// Spawn the perpetual polling loop.
pub fn spawn(
    http: Arc<Http>,
    pool: PgPool,
    config: Config,
    state: Arc<Mutex<SchedulerState>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.scheduler.enabled {
            info!("Scheduler is disabled in config");
            return;
        }

        info!(
            timezone = %config.scheduler.timezone,
            morning = %config.scheduler.morning_time,
            evening = %config.scheduler.evening_time,
            inactivity_hours = config.scheduler.inactivity.num_hours(),
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let now_utc = Utc::now();
            let now_local = now_utc.with_timezone(&config.scheduler.timezone);

            let mut state = state.lock().await;
            match evaluate(now_local, &state, &config.scheduler) {
                Decision::Fire(reason) => {
                    info!(?reason, "Triggering daily question");
                    match send_daily_question(&http, &pool, &config, MentionTarget::Configured).await {
                        Ok(Some(_)) => {
                            state.last_daily_post = Some(now_utc);
                            state.last_activity = now_utc;
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "Daily question send failed"),
                    }
                }
                Decision::SuppressedPastEvening => {
                    info!("Inactivity threshold reached but past nighttime cutoff, waiting until tomorrow morning");
                }
                Decision::Skip => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn cfg() -> SchedulerConfig {
        SchedulerConfig {
            enabled: true,
            timezone: chrono_tz::Europe::Oslo,
            morning_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            evening_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            inactivity: Duration::hours(6),
            mention: None,
        }
    }

    fn local(cfg: &SchedulerConfig, h: u32, m: u32) -> DateTime<Tz> {
        cfg.timezone.with_ymd_and_hms(2026, 8, 5, h, m, 0).unwrap()
    }

    fn state_at(now: DateTime<Tz>) -> SchedulerState {
        SchedulerState::new(now.with_timezone(&Utc))
    }

    #[test]
    fn fires_in_morning_window_when_not_posted() {
        let cfg = cfg();
        let now = local(&cfg, 8, 5);
        let state = state_at(now);
        assert_eq!(evaluate(now, &state, &cfg), Decision::Fire(TriggerReason::Morning));
    }

    #[test]
    fn morning_window_closes_after_thirty_minutes() {
        let cfg = cfg();
        let now = local(&cfg, 8, 31);
        let state = state_at(now);
        assert_eq!(evaluate(now, &state, &cfg), Decision::Skip);
    }

    #[test]
    fn does_not_refire_after_posting_today() {
        let cfg = cfg();
        let posted = local(&cfg, 8, 10);
        let now = local(&cfg, 8, 20);
        let mut state = state_at(now);
        state.last_daily_post = Some(posted.with_timezone(&Utc));

        assert_eq!(evaluate(now, &state, &cfg), Decision::Skip);
    }

    #[test]
    fn fires_again_next_morning() {
        let cfg = cfg();
        let posted = local(&cfg, 8, 10);
        let next_morning = cfg.timezone.with_ymd_and_hms(2026, 8, 6, 8, 5, 0).unwrap();
        let mut state = state_at(next_morning);
        state.last_daily_post = Some(posted.with_timezone(&Utc));

        assert_eq!(
            evaluate(next_morning, &state, &cfg),
            Decision::Fire(TriggerReason::Morning)
        );
    }

    #[test]
    fn inactivity_fires_before_evening_cutoff() {
        let cfg = cfg();
        let now = local(&cfg, 14, 0);
        let mut state = state_at(now);
        state.last_activity = (now - Duration::hours(7)).with_timezone(&Utc);

        assert_eq!(
            evaluate(now, &state, &cfg),
            Decision::Fire(TriggerReason::Inactivity)
        );
    }

    #[test]
    fn inactivity_is_suppressed_past_evening() {
        let cfg = cfg();
        let now = local(&cfg, 21, 0);
        let mut state = state_at(now);
        state.last_activity = (now - Duration::hours(7)).with_timezone(&Utc);

        assert_eq!(evaluate(now, &state, &cfg), Decision::SuppressedPastEvening);
    }

    #[test]
    fn inactivity_alone_is_not_enough() {
        let cfg = cfg();
        let now = local(&cfg, 14, 0);
        let mut state = state_at(now);
        state.last_activity = (now - Duration::hours(2)).with_timezone(&Utc);

        assert_eq!(evaluate(now, &state, &cfg), Decision::Skip);
    }

    #[test]
    fn posted_today_blocks_inactivity_trigger() {
        let cfg = cfg();
        let now = local(&cfg, 15, 0);
        let mut state = state_at(now);
        state.last_activity = (now - Duration::hours(8)).with_timezone(&Utc);
        state.last_daily_post = Some(local(&cfg, 8, 10).with_timezone(&Utc));

        assert_eq!(evaluate(now, &state, &cfg), Decision::Skip);
    }

    #[test]
    fn yesterdays_post_does_not_block_today() {
        let cfg = cfg();
        let yesterday = cfg.timezone.with_ymd_and_hms(2026, 8, 4, 8, 10, 0).unwrap();
        let now = local(&cfg, 8, 10);
        let mut state = state_at(now);
        state.last_daily_post = Some(yesterday.with_timezone(&Utc));

        assert_eq!(evaluate(now, &state, &cfg), Decision::Fire(TriggerReason::Morning));
    }

    #[test]
    fn inactivity_before_morning_does_not_fire() {
        let cfg = cfg();
        let now = local(&cfg, 3, 0);
        let mut state = state_at(now);
        state.last_activity = (now - Duration::hours(9)).with_timezone(&Utc);

        assert_eq!(evaluate(now, &state, &cfg), Decision::Skip);
    }

    #[test]
    fn at_most_one_trigger_per_tick() {
        // Both conditions hold; the morning trigger wins and only one fires.
        let cfg = cfg();
        let now = local(&cfg, 8, 10);
        let mut state = state_at(now);
        state.last_activity = (now - Duration::hours(10)).with_timezone(&Utc);

        assert_eq!(evaluate(now, &state, &cfg), Decision::Fire(TriggerReason::Morning));
    }
}
