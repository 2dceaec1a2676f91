//! Submitted daily-question storage.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};

/// Approval lifecycle of a submitted question. Transitions only ever move
/// pending → approved or pending → rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionStatus::Pending => write!(f, "pending"),
            QuestionStatus::Approved => write!(f, "approved"),
            QuestionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for QuestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuestionStatus::Pending),
            "approved" => Ok(QuestionStatus::Approved),
            "rejected" => Ok(QuestionStatus::Rejected),
            _ => Err(format!("Unknown question status: {s}")),
        }
    }
}

/// Question record
#[derive(Debug, Clone)]
pub struct Question {
    pub id: i32,
    pub question: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub times_asked: i32,
    pub last_asked_at: Option<DateTime<Utc>>,
    pub message_id: Option<String>,
    pub channel_id: Option<String>,
    pub approval_status: QuestionStatus,
    pub approval_message_id: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: i32,
    question: String,
    author_id: String,
    author_name: String,
    created_at: DateTime<Utc>,
    times_asked: i32,
    last_asked_at: Option<DateTime<Utc>>,
    message_id: Option<String>,
    channel_id: Option<String>,
    approval_status: String,
    approval_message_id: Option<String>,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            question: row.question,
            author_id: row.author_id,
            author_name: row.author_name,
            created_at: row.created_at,
            times_asked: row.times_asked,
            last_asked_at: row.last_asked_at,
            message_id: row.message_id,
            channel_id: row.channel_id,
            approval_status: row.approval_status.parse().unwrap_or(QuestionStatus::Pending),
            approval_message_id: row.approval_message_id,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
        }
    }
}

const QUESTION_COLUMNS: &str = "id, question, author_id, author_name, created_at, times_asked, \
     last_asked_at, message_id, channel_id, approval_status, approval_message_id, \
     approved_by, approved_at";

/// Counts per approval status, plus usage totals for approved questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total_asked: i64,
    pub min_asked: i64,
}

/// Question repository for database operations
pub struct QuestionRepository;

impl QuestionRepository {
    /// Store a freshly submitted question as pending.
    pub async fn add(
        pool: &PgPool,
        question: &str,
        author_id: &str,
        author_name: &str,
        message_id: Option<&str>,
        channel_id: Option<&str>,
    ) -> Result<i32, sqlx::Error> {
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO questions (question, author_id, author_name, message_id, channel_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(question)
        .bind(author_id)
        .bind(author_name)
        .bind(message_id)
        .bind(channel_id)
        .fetch_one(pool)
        .await?;

        info!(question_id = id, author = %author_name, "Stored submitted question");
        Ok(id)
    }

    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Question::from))
    }

    pub async fn get_pending_by_id(pool: &PgPool, id: i32) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND approval_status = 'pending'"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Question::from))
    }

    /// Oldest question still waiting for approval.
    pub async fn get_next_pending(pool: &PgPool) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions
             WHERE approval_status = 'pending'
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Question::from))
    }

    pub async fn get_by_approval_message_id(
        pool: &PgPool,
        approval_message_id: &str,
    ) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE approval_message_id = $1"
        ))
        .bind(approval_message_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Question::from))
    }

    /// Record the approval-queue message a question is being voted on.
    pub async fn set_approval_message_id(
        pool: &PgPool,
        id: i32,
        approval_message_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE questions SET approval_message_id = $1 WHERE id = $2")
            .bind(approval_message_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// pending → approved. Conditioned on the row still being pending so
    /// concurrent approvals apply exactly once; returns whether this call
    /// won the transition.
    pub async fn approve(pool: &PgPool, id: i32, approver_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE questions
             SET approval_status = 'approved', approved_by = $1, approved_at = NOW()
             WHERE id = $2 AND approval_status = 'pending'",
        )
        .bind(approver_id)
        .bind(id)
        .execute(pool)
        .await?;

        let won = result.rows_affected() > 0;
        if won {
            info!(question_id = id, approver = %approver_id, "Question approved");
        } else {
            debug!(question_id = id, "Approve was a no-op, question no longer pending");
        }
        Ok(won)
    }

    /// pending → rejected, same guard as [`Self::approve`].
    pub async fn reject(pool: &PgPool, id: i32, rejector_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE questions
             SET approval_status = 'rejected', approved_by = $1, approved_at = NOW()
             WHERE id = $2 AND approval_status = 'pending'",
        )
        .bind(rejector_id)
        .bind(id)
        .execute(pool)
        .await?;

        let won = result.rows_affected() > 0;
        if won {
            info!(question_id = id, rejector = %rejector_id, "Question rejected");
        }
        Ok(won)
    }

    /// Bulk edge: every pending question becomes approved in one statement.
    /// Returns the number of rows that transitioned.
    pub async fn approve_all_pending(
        pool: &PgPool,
        approver_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE questions
             SET approval_status = 'approved', approved_by = $1, approved_at = NOW()
             WHERE approval_status = 'pending'",
        )
        .bind(approver_id)
        .execute(pool)
        .await?;

        info!(count = result.rows_affected(), approver = %approver_id, "Approved all pending questions");
        Ok(result.rows_affected())
    }

    /// The question to send next: least asked, oldest submission breaking
    /// ties, approved only.
    pub async fn get_least_asked_approved(pool: &PgPool) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions
             WHERE approval_status = 'approved'
             ORDER BY times_asked ASC, created_at ASC
             LIMIT 1"
        ))
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Question::from))
    }

    /// Bump the usage counter after a successful send.
    pub async fn increment_usage(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE questions SET times_asked = times_asked + 1, last_asked_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        debug!(question_id = id, "Incremented usage count");
        Ok(())
    }

    pub async fn stats(pool: &PgPool) -> Result<QuestionStats, sqlx::Error> {
        let (pending, approved, rejected, total_asked, min_asked): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                     COUNT(*) FILTER (WHERE approval_status = 'pending'),
                     COUNT(*) FILTER (WHERE approval_status = 'approved'),
                     COUNT(*) FILTER (WHERE approval_status = 'rejected'),
                     COALESCE(SUM(times_asked) FILTER (WHERE approval_status = 'approved'), 0),
                     COALESCE(MIN(times_asked) FILTER (WHERE approval_status = 'approved'), 0)::BIGINT
                 FROM questions",
            )
            .fetch_one(pool)
            .await?;

        Ok(QuestionStats {
            pending,
            approved,
            rejected,
            total_asked,
            min_asked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            QuestionStatus::Pending,
            QuestionStatus::Approved,
            QuestionStatus::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<QuestionStatus>().unwrap(), status);
        }
        assert!("halfway_approved".parse::<QuestionStatus>().is_err());
    }
}
