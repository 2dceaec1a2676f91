//! Banned-word storage and the dual-role approval transitions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};

/// Lifecycle of a reported word. `FullyApproved` needs both moderator
/// roles, reached either stage by stage or in one combined write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordStatus {
    Pending,
    OpplysarApproved,
    FullyApproved,
    Rejected,
}

impl std::fmt::Display for WordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WordStatus::Pending => write!(f, "pending"),
            WordStatus::OpplysarApproved => write!(f, "opplysar_approved"),
            WordStatus::FullyApproved => write!(f, "fully_approved"),
            WordStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for WordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WordStatus::Pending),
            "opplysar_approved" => Ok(WordStatus::OpplysarApproved),
            "fully_approved" => Ok(WordStatus::FullyApproved),
            "rejected" => Ok(WordStatus::Rejected),
            _ => Err(format!("Unknown word status: {s}")),
        }
    }
}

/// Banned word record
#[derive(Debug, Clone)]
pub struct BannedWord {
    pub id: i32,
    pub word: String,
    pub reason: String,
    pub reporter_id: String,
    pub reporter_name: String,
    pub original_channel_id: Option<String>,
    pub original_message_id: Option<String>,
    pub forum_thread_id: Option<String>,
    pub approval_status: WordStatus,
    pub approval_message_id: Option<String>,
    pub opplysar_approved_by: Option<String>,
    pub opplysar_approved_at: Option<DateTime<Utc>>,
    pub rettskrivar_approved_by: Option<String>,
    pub rettskrivar_approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct BannedWordRow {
    id: i32,
    word: String,
    reason: String,
    reporter_id: String,
    reporter_name: String,
    original_channel_id: Option<String>,
    original_message_id: Option<String>,
    forum_thread_id: Option<String>,
    approval_status: String,
    approval_message_id: Option<String>,
    opplysar_approved_by: Option<String>,
    opplysar_approved_at: Option<DateTime<Utc>>,
    rettskrivar_approved_by: Option<String>,
    rettskrivar_approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<BannedWordRow> for BannedWord {
    fn from(row: BannedWordRow) -> Self {
        BannedWord {
            id: row.id,
            word: row.word,
            reason: row.reason,
            reporter_id: row.reporter_id,
            reporter_name: row.reporter_name,
            original_channel_id: row.original_channel_id,
            original_message_id: row.original_message_id,
            forum_thread_id: row.forum_thread_id,
            approval_status: row.approval_status.parse().unwrap_or(WordStatus::Pending),
            approval_message_id: row.approval_message_id,
            opplysar_approved_by: row.opplysar_approved_by,
            opplysar_approved_at: row.opplysar_approved_at,
            rettskrivar_approved_by: row.rettskrivar_approved_by,
            rettskrivar_approved_at: row.rettskrivar_approved_at,
            created_at: row.created_at,
        }
    }
}

const WORD_COLUMNS: &str = "id, word, reason, reporter_id, reporter_name, original_channel_id, \
     original_message_id, forum_thread_id, approval_status, approval_message_id, \
     opplysar_approved_by, opplysar_approved_at, rettskrivar_approved_by, \
     rettskrivar_approved_at, created_at";

/// Canonical form stored and looked up: surrounding whitespace and
/// punctuation stripped, lowercased. Applied on every write and read so
/// the UNIQUE constraint deduplicates case and punctuation variants.
pub fn normalize(word: &str) -> String {
    word.trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || c == '«' || c == '»')
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WordStats {
    pub pending: i64,
    pub opplysar_approved: i64,
    pub fully_approved: i64,
    pub rejected: i64,
}

/// Banned word repository for database operations
pub struct BannedWordRepository;

impl BannedWordRepository {
    /// Insert a reported word as pending. The word is normalised first;
    /// a duplicate (same canonical form) returns the unique-violation
    /// error untouched so callers can report "already listed".
    pub async fn add_pending(
        pool: &PgPool,
        word: &str,
        reason: &str,
        reporter_id: &str,
        reporter_name: &str,
        original_channel_id: Option<&str>,
        original_message_id: Option<&str>,
    ) -> Result<i32, sqlx::Error> {
        let canonical = normalize(word);
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO banned_words
                 (word, reason, reporter_id, reporter_name, original_channel_id, original_message_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(&canonical)
        .bind(reason)
        .bind(reporter_id)
        .bind(reporter_name)
        .bind(original_channel_id)
        .bind(original_message_id)
        .fetch_one(pool)
        .await?;

        info!(word_id = id, word = %canonical, reporter = %reporter_name, "Stored pending banned word");
        Ok(id)
    }

    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<BannedWord>, sqlx::Error> {
        let row = sqlx::query_as::<_, BannedWordRow>(&format!(
            "SELECT {WORD_COLUMNS} FROM banned_words WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(BannedWord::from))
    }

    pub async fn get_by_approval_message_id(
        pool: &PgPool,
        approval_message_id: &str,
    ) -> Result<Option<BannedWord>, sqlx::Error> {
        let row = sqlx::query_as::<_, BannedWordRow>(&format!(
            "SELECT {WORD_COLUMNS} FROM banned_words WHERE approval_message_id = $1"
        ))
        .bind(approval_message_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(BannedWord::from))
    }

    pub async fn get_next_pending(pool: &PgPool) -> Result<Option<BannedWord>, sqlx::Error> {
        let row = sqlx::query_as::<_, BannedWordRow>(&format!(
            "SELECT {WORD_COLUMNS} FROM banned_words
             WHERE approval_status = 'pending'
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .fetch_optional(pool)
        .await?;
        Ok(row.map(BannedWord::from))
    }

    pub async fn set_approval_message_id(
        pool: &PgPool,
        id: i32,
        approval_message_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE banned_words SET approval_message_id = $1 WHERE id = $2")
            .bind(approval_message_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Sequential stage A: pending → opplysar_approved. Guarded on the
    /// current state; returns whether the transition applied.
    pub async fn approve_by_opplysar(
        pool: &PgPool,
        id: i32,
        approver_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE banned_words
             SET approval_status = 'opplysar_approved',
                 opplysar_approved_by = $1, opplysar_approved_at = NOW()
             WHERE id = $2 AND approval_status = 'pending'",
        )
        .bind(approver_id)
        .bind(id)
        .execute(pool)
        .await?;

        let won = result.rows_affected() > 0;
        if won {
            info!(word_id = id, approver = %approver_id, "Word approved by opplysar");
        } else {
            debug!(word_id = id, "Opplysar approve was a no-op, word not pending");
        }
        Ok(won)
    }

    /// Sequential stage B: opplysar_approved → fully_approved. Fails (no
    /// rows) when stage A has not been recorded, so order is enforced.
    pub async fn approve_by_rettskrivar(
        pool: &PgPool,
        id: i32,
        approver_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE banned_words
             SET approval_status = 'fully_approved',
                 rettskrivar_approved_by = $1, rettskrivar_approved_at = NOW()
             WHERE id = $2 AND approval_status = 'opplysar_approved'",
        )
        .bind(approver_id)
        .bind(id)
        .execute(pool)
        .await?;

        let won = result.rows_affected() > 0;
        if won {
            info!(word_id = id, approver = %approver_id, "Word fully approved by rettskrivar");
        } else {
            debug!(word_id = id, "Rettskrivar approve was a no-op, word not opplysar_approved");
        }
        Ok(won)
    }

    /// Combined path: pending → fully_approved in one write, recording
    /// every qualifying reactor for both roles (comma-separated lists).
    pub async fn approve_combined(
        pool: &PgPool,
        id: i32,
        opplysar_approvers: &[String],
        rettskrivar_approvers: &[String],
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE banned_words
             SET approval_status = 'fully_approved',
                 opplysar_approved_by = $1, opplysar_approved_at = NOW(),
                 rettskrivar_approved_by = $2, rettskrivar_approved_at = NOW()
             WHERE id = $3 AND approval_status = 'pending'",
        )
        .bind(opplysar_approvers.join(","))
        .bind(rettskrivar_approvers.join(","))
        .bind(id)
        .execute(pool)
        .await?;

        let won = result.rows_affected() > 0;
        if won {
            info!(word_id = id, "Word fully approved through combined consensus");
        }
        Ok(won)
    }

    /// pending → rejected, single shot.
    pub async fn reject(pool: &PgPool, id: i32, rejector_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE banned_words
             SET approval_status = 'rejected',
                 opplysar_approved_by = $1, opplysar_approved_at = NOW()
             WHERE id = $2 AND approval_status = 'pending'",
        )
        .bind(rejector_id)
        .bind(id)
        .execute(pool)
        .await?;

        let won = result.rows_affected() > 0;
        if won {
            info!(word_id = id, rejector = %rejector_id, "Word rejected");
        }
        Ok(won)
    }

    /// Record the discussion thread once it exists. Callers check
    /// `forum_thread_id` before creating a thread so this stays one-time.
    pub async fn set_forum_thread_id(
        pool: &PgPool,
        id: i32,
        forum_thread_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE banned_words SET forum_thread_id = $1 WHERE id = $2")
            .bind(forum_thread_id)
            .bind(id)
            .execute(pool)
            .await?;
        info!(word_id = id, thread = %forum_thread_id, "Recorded discussion thread for word");
        Ok(())
    }

    /// Look a word up by canonical form, fully-approved entries only.
    /// This is the check the message scanner uses.
    pub async fn find_banned(
        pool: &PgPool,
        word: &str,
    ) -> Result<Option<BannedWord>, sqlx::Error> {
        let row = sqlx::query_as::<_, BannedWordRow>(&format!(
            "SELECT {WORD_COLUMNS} FROM banned_words
             WHERE word = $1 AND approval_status = 'fully_approved'"
        ))
        .bind(normalize(word))
        .fetch_optional(pool)
        .await?;
        Ok(row.map(BannedWord::from))
    }

    /// Look a word up by canonical form regardless of status (used to
    /// detect duplicate reports).
    pub async fn find_any(pool: &PgPool, word: &str) -> Result<Option<BannedWord>, sqlx::Error> {
        let row = sqlx::query_as::<_, BannedWordRow>(&format!(
            "SELECT {WORD_COLUMNS} FROM banned_words WHERE word = $1"
        ))
        .bind(normalize(word))
        .fetch_optional(pool)
        .await?;
        Ok(row.map(BannedWord::from))
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<BannedWord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BannedWordRow>(&format!(
            "SELECT {WORD_COLUMNS} FROM banned_words ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(BannedWord::from).collect())
    }

    pub async fn stats(pool: &PgPool) -> Result<WordStats, sqlx::Error> {
        let (pending, opplysar_approved, fully_approved, rejected): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                     COUNT(*) FILTER (WHERE approval_status = 'pending'),
                     COUNT(*) FILTER (WHERE approval_status = 'opplysar_approved'),
                     COUNT(*) FILTER (WHERE approval_status = 'fully_approved'),
                     COUNT(*) FILTER (WHERE approval_status = 'rejected')
                 FROM banned_words",
            )
            .fetch_one(pool)
            .await?;

        Ok(WordStats {
            pending,
            opplysar_approved,
            fully_approved,
            rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_canonical() {
        assert_eq!(normalize("Dett"), "dett");
        assert_eq!(normalize("  dett,  "), "dett");
        assert_eq!(normalize("«DETT!»"), "dett");
        assert_eq!(normalize("når"), "når");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["Dett.", " SPØRSMÅL ", "«ordet»", "plain"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            WordStatus::Pending,
            WordStatus::OpplysarApproved,
            WordStatus::FullyApproved,
            WordStatus::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<WordStatus>().unwrap(), status);
        }
    }
}
