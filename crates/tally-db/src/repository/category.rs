//! # Category Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use super::rows::CategoryRow;
use crate::error::{DbError, DbResult};
use tally_core::validation::validate_category_name;
use tally_core::{Category, CoreError, NewCategory};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category. Names are unique.
    pub async fn create(&self, new: &NewCategory) -> DbResult<Category> {
        validate_category_name(&new.name)?;

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(name = %category.name, "Creating category");

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &category.name),
                other => other,
            })?;

        Ok(category)
    }

    pub async fn get(&self, id: &str) -> DbResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, created_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Category::from)
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()).into())
    }

    /// Lists categories alphabetically.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }
}
