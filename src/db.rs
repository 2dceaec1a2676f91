pub mod banned_words;
pub mod questions;
pub mod starboard;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Initialize the PostgreSQL connection pool and run migrations.
///
/// `schema` namespaces every table (separate production/testing keyspaces
/// share one database). The name is validated and applied through
/// `set_config` with a bound parameter on each fresh connection; it is
/// never spliced into query text.
pub async fn init_pool(database_url: &str, schema: &str) -> Result<PgPool, sqlx::Error> {
    let schema = validate_schema_name(schema)?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .after_connect({
            let schema = schema.clone();
            move |conn, _meta| {
                let schema = schema.clone();
                Box::pin(async move {
                    sqlx::query("SELECT set_config('search_path', $1, false)")
                        .bind(schema)
                        .execute(conn)
                        .await?;
                    Ok(())
                })
            }
        })
        .connect(database_url)
        .await?;

    if schema != "public" {
        // DDL cannot take bound parameters; the name was validated above.
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\""))
            .execute(&pool)
            .await?;
    }

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!(schema = %schema, "Database initialized and migrations applied");

    Ok(pool)
}

/// Restrict schema names to plain lowercase identifiers so the one place
/// the name must appear in DDL cannot carry injected SQL.
fn validate_schema_name(schema: &str) -> Result<String, sqlx::Error> {
    let ok = !schema.is_empty()
        && schema.len() <= 63
        && schema.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && schema
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(schema.to_string())
    } else {
        Err(sqlx::Error::Configuration(
            format!("invalid database schema name: '{schema}'").into(),
        ))
    }
}

/// Drop all bot tables. Destructive; only reachable through the
/// confirmation round-trip in the tømdb command.
pub async fn clear_all(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("TRUNCATE questions, banned_words, starboard_posts")
        .execute(pool)
        .await?;
    info!("All bot tables truncated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_schema_name;

    #[test]
    fn schema_names_are_validated() {
        assert!(validate_schema_name("public").is_ok());
        assert!(validate_schema_name("tyrihans_testing").is_ok());
        assert!(validate_schema_name("").is_err());
        assert!(validate_schema_name("Public").is_err());
        assert!(validate_schema_name("x; DROP TABLE questions").is_err());
        assert!(validate_schema_name("1starts_with_digit").is_err());
    }
}
