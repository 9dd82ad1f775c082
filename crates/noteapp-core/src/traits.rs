//! Core traits for noteapp abstractions.
//!
//! These traits define the interfaces that concrete storage backends
//! must satisfy, enabling pluggable backends and testability. Every
//! method is one unit of work: implementations must apply all of its
//! effects or none of them.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY TRAIT
// =============================================================================

/// Repository for notes and their category associations.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// List notes matching the archive filter, newest first.
    async fn list(&self, filter: ArchiveFilter) -> Result<Vec<Note>>;

    /// Fetch a single note with its categories.
    ///
    /// Fails with `NoteNotFound` if no note has this id.
    async fn fetch(&self, id: Uuid) -> Result<Note>;

    /// Check whether a note exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Create a note and attach the requested categories.
    ///
    /// Fails with `CategoryNotFound` for the first unknown category id, in
    /// which case no note is stored.
    async fn insert(&self, req: NoteRequest) -> Result<Note>;

    /// Replace title, content, archived flag and the whole category set.
    async fn update(&self, id: Uuid, req: NoteRequest) -> Result<Note>;

    /// Delete a note. Its categories are left in place.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Set the archived flag. Setting it to its current value succeeds.
    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<()>;

    /// Mark a note as archived.
    async fn archive(&self, id: Uuid) -> Result<()> {
        self.set_archived(id, true).await
    }

    /// Mark a note as active again.
    async fn unarchive(&self, id: Uuid) -> Result<()> {
        self.set_archived(id, false).await
    }

    /// Associate a category with a note; a no-op if already associated.
    async fn add_category(&self, note_id: Uuid, category_id: Uuid) -> Result<Note>;

    /// Dissociate a category from a note; a no-op if not associated.
    async fn remove_category(&self, note_id: Uuid, category_id: Uuid) -> Result<Note>;

    /// List notes filed under a category, newest first.
    ///
    /// Fails with `CategoryNotFound` if the category does not exist.
    async fn list_by_category(&self, category_id: Uuid, filter: ArchiveFilter)
        -> Result<Vec<Note>>;
}

// =============================================================================
// CATEGORY REPOSITORY TRAIT
// =============================================================================

/// Repository for category management.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// List all categories ordered by name.
    async fn list(&self) -> Result<Vec<Category>>;

    /// Get a category by id.
    async fn get(&self, id: Uuid) -> Result<Option<Category>>;

    /// Get a category by its exact name.
    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Check whether a category exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Create a category, or return the existing one with the same name.
    async fn create(&self, req: CategoryRequest) -> Result<Category>;

    /// Rename a category.
    ///
    /// Fails with `CategoryNotFound` if absent and `Conflict` if another
    /// category already uses the name.
    async fn update(&self, id: Uuid, req: CategoryRequest) -> Result<Category>;

    /// Delete a category, dropping its note associations.
    async fn delete(&self, id: Uuid) -> Result<()>;
}
