//! Note repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use noteapp_core::{
    new_v7, ArchiveFilter, Category, Error, Note, NoteRepository, NoteRequest, Result,
};

/// PostgreSQL implementation of NoteRepository.
///
/// The `note_category` join table is the only place the association
/// lives, so both directions (a note's categories, a category's notes)
/// read the same rows. All writes to it go through
/// [`attach_category_tx`] and [`detach_category_tx`].
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

// =============================================================================
// QUERY HELPERS
// =============================================================================

const NOTE_COLUMNS: &str =
    "n.id, n.title, n.content, n.archived, n.created_at_utc, n.updated_at_utc";

/// Build the archived-state clause for a list query.
fn build_filter_clause(filter: ArchiveFilter) -> &'static str {
    match filter {
        ArchiveFilter::All => "",
        ArchiveFilter::Active => "AND n.archived = false",
        ArchiveFilter::Archived => "AND n.archived = true",
    }
}

fn list_sql(filter: ArchiveFilter) -> String {
    format!(
        "SELECT {} FROM note n WHERE TRUE {} ORDER BY n.created_at_utc DESC, n.id DESC",
        NOTE_COLUMNS,
        build_filter_clause(filter)
    )
}

fn list_by_category_sql(filter: ArchiveFilter) -> String {
    format!(
        "SELECT {} FROM note n
         JOIN note_category nc ON nc.note_id = n.id
         WHERE nc.category_id = $1 {}
         ORDER BY n.created_at_utc DESC, n.id DESC",
        NOTE_COLUMNS,
        build_filter_clause(filter)
    )
}

/// Map a database row to a Note without categories.
fn map_row_to_note(row: &sqlx::postgres::PgRow) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        archived: row.get("archived"),
        categories: Vec::new(),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    }
}

// =============================================================================
// ASSOCIATION MANAGEMENT
// =============================================================================

/// Fail with `CategoryNotFound` unless the category exists.
///
/// The row is share-locked until the transaction ends so it cannot be
/// deleted between this check and the association insert.
async fn require_category_tx(tx: &mut Transaction<'_, Postgres>, category_id: Uuid) -> Result<()> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM category WHERE id = $1 FOR KEY SHARE")
            .bind(category_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?;
    found.map(|_| ()).ok_or(Error::CategoryNotFound(category_id))
}

/// Fail with `NoteNotFound` unless the note exists, locking it for update.
async fn lock_note_tx(tx: &mut Transaction<'_, Postgres>, note_id: Uuid) -> Result<()> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM note WHERE id = $1 FOR UPDATE")
        .bind(note_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;
    found.map(|_| ()).ok_or(Error::NoteNotFound(note_id))
}

/// Associate a note with a category. Existing associations are kept as-is.
pub async fn attach_category_tx(
    tx: &mut Transaction<'_, Postgres>,
    note_id: Uuid,
    category_id: Uuid,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO note_category (note_id, category_id, created_at_utc) VALUES ($1, $2, $3)
         ON CONFLICT (note_id, category_id) DO NOTHING",
    )
    .bind(note_id)
    .bind(category_id)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

/// Remove the association between a note and a category, if any.
pub async fn detach_category_tx(
    tx: &mut Transaction<'_, Postgres>,
    note_id: Uuid,
    category_id: Uuid,
) -> Result<()> {
    sqlx::query("DELETE FROM note_category WHERE note_id = $1 AND category_id = $2")
        .bind(note_id)
        .bind(category_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

/// Remove every category association of a note.
async fn detach_all_categories_tx(tx: &mut Transaction<'_, Postgres>, note_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM note_category WHERE note_id = $1")
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

/// Load the categories of many notes in one query, keyed by note id.
async fn load_categories_tx(
    tx: &mut Transaction<'_, Postgres>,
    note_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Category>>> {
    if note_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        "SELECT nc.note_id, c.id, c.name, c.created_at_utc
         FROM note_category nc
         JOIN category c ON c.id = nc.category_id
         WHERE nc.note_id = ANY($1)
         ORDER BY c.name, c.id",
    )
    .bind(note_ids)
    .fetch_all(&mut **tx)
    .await
    .map_err(Error::Database)?;

    let mut by_note: HashMap<Uuid, Vec<Category>> = HashMap::new();
    for row in rows {
        by_note
            .entry(row.get("note_id"))
            .or_default()
            .push(Category {
                id: row.get("id"),
                name: row.get("name"),
                created_at_utc: row.get("created_at_utc"),
            });
    }
    Ok(by_note)
}

/// Attach categories to a batch of notes loaded without them.
async fn with_categories_tx(
    tx: &mut Transaction<'_, Postgres>,
    mut notes: Vec<Note>,
) -> Result<Vec<Note>> {
    let ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
    let mut by_note = load_categories_tx(tx, &ids).await?;
    for note in &mut notes {
        note.categories = by_note.remove(&note.id).unwrap_or_default();
    }
    Ok(notes)
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list(&self, filter: ArchiveFilter) -> Result<Vec<Note>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.list_tx(&mut tx, filter).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.fetch_tx(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM note WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn insert(&self, req: NoteRequest) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self.insert_tx(&mut tx, req).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "insert",
            note_id = %note.id,
            category_count = note.categories.len(),
            "Note created"
        );
        Ok(note)
    }

    async fn update(&self, id: Uuid, req: NoteRequest) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self.update_tx(&mut tx, id, req).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "update",
            note_id = %id,
            category_count = note.categories.len(),
            "Note replaced"
        );
        Ok(note)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.delete_tx(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "delete",
            note_id = %id,
            "Note deleted"
        );
        Ok(())
    }

    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.set_archived_tx(&mut tx, id, archived).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "set_archived",
            note_id = %id,
            archived,
            "Note archive state set"
        );
        Ok(())
    }

    async fn add_category(&self, note_id: Uuid, category_id: Uuid) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self.add_category_tx(&mut tx, note_id, category_id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(note)
    }

    async fn remove_category(&self, note_id: Uuid, category_id: Uuid) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self
            .remove_category_tx(&mut tx, note_id, category_id)
            .await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(note)
    }

    async fn list_by_category(
        &self,
        category_id: Uuid,
        filter: ArchiveFilter,
    ) -> Result<Vec<Note>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.list_by_category_tx(&mut tx, category_id, filter).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }
}

// =============================================================================
// TRANSACTION-AWARE VARIANTS
// =============================================================================

/// Transaction-aware variants.
///
/// These methods accept an existing transaction, allowing several note
/// operations to be composed within a single database transaction. An
/// error returned midway leaves the transaction to be rolled back when it
/// is dropped.
impl PgNoteRepository {
    /// List notes within an existing transaction.
    pub async fn list_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: ArchiveFilter,
    ) -> Result<Vec<Note>> {
        let rows = sqlx::query(&list_sql(filter))
            .fetch_all(&mut **tx)
            .await
            .map_err(Error::Database)?;
        let notes: Vec<Note> = rows.iter().map(map_row_to_note).collect();

        debug!(
            subsystem = "database",
            component = "notes",
            op = "list",
            filter = %filter,
            result_count = notes.len(),
            "Listed notes"
        );
        with_categories_tx(tx, notes).await
    }

    /// Fetch a note with its categories within an existing transaction.
    pub async fn fetch_tx(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Note> {
        let sql = format!("SELECT {} FROM note n WHERE n.id = $1", NOTE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::NoteNotFound(id))?;

        let mut note = map_row_to_note(&row);
        note.categories = load_categories_tx(tx, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(note)
    }

    /// Insert a note and its category associations within an existing transaction.
    ///
    /// Every requested category is checked before the note row is written.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        req: NoteRequest,
    ) -> Result<Note> {
        let category_ids = req.unique_category_ids();
        for category_id in &category_ids {
            require_category_tx(tx, *category_id).await?;
        }

        let id = new_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO note (id, title, content, archived, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.archived)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        for category_id in category_ids {
            attach_category_tx(tx, id, category_id).await?;
        }

        self.fetch_tx(tx, id).await
    }

    /// Replace a note's fields and category set within an existing transaction.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        req: NoteRequest,
    ) -> Result<Note> {
        lock_note_tx(tx, id).await?;

        let category_ids = req.unique_category_ids();
        for category_id in &category_ids {
            require_category_tx(tx, *category_id).await?;
        }

        detach_all_categories_tx(tx, id).await?;

        sqlx::query(
            "UPDATE note SET title = $1, content = $2, archived = $3, updated_at_utc = $4
             WHERE id = $5",
        )
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.archived)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        for category_id in category_ids {
            attach_category_tx(tx, id, category_id).await?;
        }

        self.fetch_tx(tx, id).await
    }

    /// Delete a note within an existing transaction.
    ///
    /// Association rows go with it (`ON DELETE CASCADE`); categories stay.
    pub async fn delete_tx(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    /// Set the archived flag within an existing transaction.
    pub async fn set_archived_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        archived: bool,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE note SET archived = $1, updated_at_utc = $2 WHERE id = $3")
                .bind(archived)
                .bind(Utc::now())
                .bind(id)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    /// Associate a category with a note within an existing transaction.
    pub async fn add_category_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        category_id: Uuid,
    ) -> Result<Note> {
        lock_note_tx(tx, note_id).await?;
        require_category_tx(tx, category_id).await?;
        attach_category_tx(tx, note_id, category_id).await?;
        self.fetch_tx(tx, note_id).await
    }

    /// Dissociate a category from a note within an existing transaction.
    pub async fn remove_category_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        category_id: Uuid,
    ) -> Result<Note> {
        lock_note_tx(tx, note_id).await?;
        require_category_tx(tx, category_id).await?;
        detach_category_tx(tx, note_id, category_id).await?;
        self.fetch_tx(tx, note_id).await
    }

    /// List the notes filed under a category within an existing transaction.
    pub async fn list_by_category_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        category_id: Uuid,
        filter: ArchiveFilter,
    ) -> Result<Vec<Note>> {
        require_category_tx(tx, category_id).await?;

        let rows = sqlx::query(&list_by_category_sql(filter))
            .bind(category_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(Error::Database)?;
        let notes: Vec<Note> = rows.iter().map(map_row_to_note).collect();
        with_categories_tx(tx, notes).await
    }
}
