//! Starboard message mapping: original message → starboard mirror.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StarboardPost {
    pub original_message_id: String,
    pub original_channel_id: String,
    pub starboard_message_id: String,
    pub star_count: i32,
    pub created_at: DateTime<Utc>,
}

pub struct StarboardRepository;

impl StarboardRepository {
    pub async fn get(
        pool: &PgPool,
        original_message_id: &str,
    ) -> Result<Option<StarboardPost>, sqlx::Error> {
        sqlx::query_as::<_, StarboardPost>(
            "SELECT original_message_id, original_channel_id, starboard_message_id, star_count, created_at
             FROM starboard_posts
             WHERE original_message_id = $1",
        )
        .bind(original_message_id)
        .fetch_optional(pool)
        .await
    }

    /// Insert or refresh the mapping. Safe to call repeatedly with the
    /// same observation.
    pub async fn upsert(
        pool: &PgPool,
        original_message_id: &str,
        original_channel_id: &str,
        starboard_message_id: &str,
        star_count: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO starboard_posts
                 (original_message_id, original_channel_id, starboard_message_id, star_count)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (original_message_id)
             DO UPDATE SET starboard_message_id = $3, star_count = $4",
        )
        .bind(original_message_id)
        .bind(original_channel_id)
        .bind(starboard_message_id)
        .bind(star_count)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &PgPool, original_message_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM starboard_posts WHERE original_message_id = $1")
            .bind(original_message_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
