//! Category repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use noteapp_core::{
    new_v7, normalize_category_name, Category, CategoryRepository, CategoryRequest, Error, Result,
};

const CATEGORY_COLUMNS: &str = "id, name, created_at_utc";

/// PostgreSQL implementation of CategoryRepository.
pub struct PgCategoryRepository {
    pool: Pool<Postgres>,
}

impl PgCategoryRepository {
    /// Create a new PgCategoryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_category(row: &sqlx::postgres::PgRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        created_at_utc: row.get("created_at_utc"),
    }
}

/// Translate a unique violation on the category name into `Conflict`.
fn map_rename_error(e: sqlx::Error, name: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return Error::Conflict(format!("A category named '{}' already exists", name));
        }
    }
    Error::Database(e)
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM category ORDER BY name, id",
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "categories",
            op = "list",
            result_count = rows.len(),
            "Listed categories"
        );
        Ok(rows.iter().map(map_row_to_category).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM category WHERE id = $1", CATEGORY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(map_row_to_category))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM category WHERE name = $1", CATEGORY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(map_row_to_category))
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM category WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn create(&self, req: CategoryRequest) -> Result<Category> {
        let name = normalize_category_name(&req.name)?;
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let category = self.create_tx(&mut tx, &name).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(category)
    }

    async fn update(&self, id: Uuid, req: CategoryRequest) -> Result<Category> {
        let name = normalize_category_name(&req.name)?;
        let sql = format!(
            "UPDATE category SET name = $1 WHERE id = $2 RETURNING {}",
            CATEGORY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_rename_error(e, &name))?
            .ok_or(Error::CategoryNotFound(id))?;

        info!(
            subsystem = "database",
            component = "categories",
            op = "update",
            category_id = %id,
            name = %name,
            "Category renamed"
        );
        Ok(map_row_to_category(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // note_category rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::CategoryNotFound(id));
        }

        info!(
            subsystem = "database",
            component = "categories",
            op = "delete",
            category_id = %id,
            "Category deleted"
        );
        Ok(())
    }
}

impl PgCategoryRepository {
    /// Create a category or return the one already using `name`.
    ///
    /// `name` must already be normalized.
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> Result<Category> {
        let sql = format!(
            "INSERT INTO category (id, name, created_at_utc) VALUES ($1, $2, $3)
             ON CONFLICT (name) DO NOTHING
             RETURNING {}",
            CATEGORY_COLUMNS
        );
        let inserted = sqlx::query(&sql)
            .bind(new_v7())
            .bind(name)
            .bind(Utc::now())
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?;

        if let Some(row) = inserted {
            let category = map_row_to_category(&row);
            info!(
                subsystem = "database",
                component = "categories",
                op = "create",
                category_id = %category.id,
                name = %category.name,
                "Category created"
            );
            return Ok(category);
        }

        let sql = format!("SELECT {} FROM category WHERE name = $1", CATEGORY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "categories",
            op = "create",
            name = %name,
            "Category already exists, returning existing"
        );
        Ok(map_row_to_category(&row))
    }
}
