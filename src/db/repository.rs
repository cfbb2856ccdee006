//! Database repository for drink records.
//!
//! Every write runs in its own transaction; dropping the transaction on an
//! early return rolls it back.

use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Drink, DrinkChanges, Ingredient, NewDrink};

/// Database repository for all drink operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all drinks ordered by id.
    pub async fn list_drinks(&self) -> Result<Vec<Drink>, AppError> {
        let rows = sqlx::query("SELECT id, title, recipe FROM drinks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(drink_from_row).collect()
    }

    /// Get a drink by ID.
    pub async fn get_drink(&self, id: i64) -> Result<Option<Drink>, AppError> {
        let row = sqlx::query("SELECT id, title, recipe FROM drinks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(drink_from_row).transpose()
    }

    /// Get a drink by its exact title.
    pub async fn find_drink_by_title(&self, title: &str) -> Result<Option<Drink>, AppError> {
        let row = sqlx::query("SELECT id, title, recipe FROM drinks WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(drink_from_row).transpose()
    }

    /// Create a new drink.
    pub async fn create_drink(&self, drink: &NewDrink) -> Result<Drink, AppError> {
        let recipe_json = serde_json::to_string(&drink.recipe)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO drinks (title, recipe) VALUES (?, ?)")
            .bind(&drink.title)
            .bind(&recipe_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, &drink.title))?;

        tx.commit().await?;

        let id = result.last_insert_rowid();
        tracing::info!("Created drink {} ({})", id, drink.title);

        Ok(Drink {
            id,
            title: drink.title.clone(),
            recipe: drink.recipe.clone(),
        })
    }

    /// Apply the supplied fields to an existing drink.
    pub async fn update_drink(&self, id: i64, changes: &DrinkChanges) -> Result<Drink, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT id, title, recipe FROM drinks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let existing = row
            .as_ref()
            .map(drink_from_row)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("Drink {} not found", id)))?;

        if changes.is_empty() {
            return Ok(existing);
        }

        let title = changes.title.clone().unwrap_or(existing.title);
        let recipe = changes.recipe.clone().unwrap_or(existing.recipe);
        let recipe_json = serde_json::to_string(&recipe)?;

        sqlx::query("UPDATE drinks SET title = ?, recipe = ? WHERE id = ?")
            .bind(&title)
            .bind(&recipe_json)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, &title))?;

        tx.commit().await?;
        tracing::info!("Updated drink {}", id);

        Ok(Drink { id, title, recipe })
    }

    /// Delete a drink.
    pub async fn delete_drink(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM drinks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Drink {} not found", id)));
        }

        tx.commit().await?;
        tracing::info!("Deleted drink {}", id);
        Ok(())
    }
}

/// Map constraint violations on write to validation errors.
fn write_error(err: sqlx::Error, title: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation(format!("A drink titled '{}' already exists", title))
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            AppError::Validation(format!("Title '{}' violates the title constraints", title))
        }
        _ => AppError::from(err),
    }
}

fn drink_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Drink, AppError> {
    let recipe: String = row.get("recipe");
    let recipe: Vec<Ingredient> = serde_json::from_str(&recipe)?;

    Ok(Drink {
        id: row.get("id"),
        title: row.get("title"),
        recipe,
    })
}
