//! Database module for SQLite persistence.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::models::Ingredient;

const CREATE_DRINKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS drinks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL UNIQUE CHECK (length(title) BETWEEN 1 AND 80),
        recipe TEXT NOT NULL
    );
"#;

/// Initialize the database connection pool and create the schema.
pub async fn init_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    // Ensure the parent directory exists
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::query(CREATE_DRINKS_TABLE).execute(&pool).await?;

    Ok(pool)
}

/// Drop all drinks and start over with a single seeded drink.
pub async fn reset_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let seed = vec![Ingredient {
        color: "blue".to_string(),
        name: "water".to_string(),
        parts: 1,
    }];
    let recipe = serde_json::to_string(&seed).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let mut tx = pool.begin().await?;

    sqlx::query("DROP TABLE IF EXISTS drinks")
        .execute(&mut *tx)
        .await?;
    sqlx::query(CREATE_DRINKS_TABLE).execute(&mut *tx).await?;
    sqlx::query("INSERT INTO drinks (title, recipe) VALUES (?, ?)")
        .bind("water")
        .bind(&recipe)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::warn!("Drinks table reset and seeded");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn url_for(dir: &TempDir) -> String {
        format!(
            "sqlite:{}?mode=rwc",
            dir.path().join("nested/drinks.sqlite").display()
        )
    }

    #[tokio::test]
    async fn test_init_creates_parent_dir_and_schema() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&url_for(&dir)).await.unwrap();

        assert!(dir.path().join("nested").is_dir());
        let repo = Repository::new(pool);
        assert!(repo.list_drinks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let url = url_for(&dir);

        let pool = init_database(&url).await.unwrap();
        pool.close().await;

        assert!(init_database(&url).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_seeds_water() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&url_for(&dir)).await.unwrap();
        let repo = Repository::new(pool.clone());

        reset_database(&pool).await.unwrap();

        let drinks = repo.list_drinks().await.unwrap();
        assert_eq!(drinks.len(), 1);
        assert_eq!(drinks[0].title, "water");
        assert_eq!(drinks[0].recipe[0].color, "blue");
        assert_eq!(drinks[0].recipe[0].name, "water");
        assert_eq!(drinks[0].recipe[0].parts, 1);
    }
}
