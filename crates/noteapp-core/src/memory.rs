//! In-memory implementation of the repository traits for testing.
//!
//! Both sides of the note/category association are stored explicitly
//! (`NoteRecord::category_ids` and `CategoryRecord::note_ids`) and only
//! ever change through [`MemoryState::link`] and [`MemoryState::unlink`].
//! Every operation takes the write lock once and validates its inputs
//! before mutating, so a failed call leaves the state untouched.
//!
//! Compiled for tests and behind the `mock` feature.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    normalize_category_name, ArchiveFilter, Category, CategoryRequest, Note, NoteRequest,
};
use crate::traits::{CategoryRepository, NoteRepository};
use crate::uuid_utils::new_v7;

#[derive(Debug, Clone)]
struct NoteRecord {
    title: String,
    content: String,
    archived: bool,
    category_ids: BTreeSet<Uuid>,
    created_at_utc: DateTime<Utc>,
    updated_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CategoryRecord {
    name: String,
    note_ids: BTreeSet<Uuid>,
    created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    notes: HashMap<Uuid, NoteRecord>,
    categories: HashMap<Uuid, CategoryRecord>,
}

impl MemoryState {
    /// Associate a note and a category on both sides.
    fn link(&mut self, note_id: Uuid, category_id: Uuid) {
        if let Some(note) = self.notes.get_mut(&note_id) {
            note.category_ids.insert(category_id);
        }
        if let Some(category) = self.categories.get_mut(&category_id) {
            category.note_ids.insert(note_id);
        }
    }

    /// Dissociate a note and a category on both sides.
    fn unlink(&mut self, note_id: Uuid, category_id: Uuid) {
        if let Some(note) = self.notes.get_mut(&note_id) {
            note.category_ids.remove(&category_id);
        }
        if let Some(category) = self.categories.get_mut(&category_id) {
            category.note_ids.remove(&note_id);
        }
    }

    fn require_note(&self, id: Uuid) -> Result<()> {
        if self.notes.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::NoteNotFound(id))
        }
    }

    fn require_category(&self, id: Uuid) -> Result<()> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::CategoryNotFound(id))
        }
    }

    fn category(&self, id: Uuid) -> Option<Category> {
        self.categories.get(&id).map(|c| Category {
            id,
            name: c.name.clone(),
            created_at_utc: c.created_at_utc,
        })
    }

    fn note(&self, id: Uuid) -> Option<Note> {
        let record = self.notes.get(&id)?;
        let mut categories: Vec<Category> = record
            .category_ids
            .iter()
            .filter_map(|cid| self.category(*cid))
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Some(Note {
            id,
            title: record.title.clone(),
            content: record.content.clone(),
            archived: record.archived,
            categories,
            created_at_utc: record.created_at_utc,
            updated_at_utc: record.updated_at_utc,
        })
    }

    fn collect_notes<I>(&self, ids: I, filter: ArchiveFilter) -> Vec<Note>
    where
        I: IntoIterator<Item = Uuid>,
    {
        let mut notes: Vec<Note> = ids
            .into_iter()
            .filter_map(|id| self.note(id))
            .filter(|n| filter.matches(n.archived))
            .collect();
        notes.sort_by(|a, b| {
            b.created_at_utc
                .cmp(&a.created_at_utc)
                .then(b.id.cmp(&a.id))
        });
        notes
    }

    fn detach_all(&mut self, note_id: Uuid) {
        let attached: Vec<Uuid> = self
            .notes
            .get(&note_id)
            .map(|n| n.category_ids.iter().copied().collect())
            .unwrap_or_default();
        for category_id in attached {
            self.unlink(note_id, category_id);
        }
    }
}

/// In-memory store implementing both [`NoteRepository`] and
/// [`CategoryRepository`] over shared state.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteRepository for InMemoryStore {
    async fn list(&self, filter: ArchiveFilter) -> Result<Vec<Note>> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state.notes.keys().copied().collect();
        Ok(state.collect_notes(ids, filter))
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        let state = self.state.read().await;
        state.note(id).ok_or(Error::NoteNotFound(id))
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.notes.contains_key(&id))
    }

    async fn insert(&self, req: NoteRequest) -> Result<Note> {
        let mut state = self.state.write().await;
        let category_ids = req.unique_category_ids();
        for category_id in &category_ids {
            state.require_category(*category_id)?;
        }

        let id = new_v7();
        let now = Utc::now();
        state.notes.insert(
            id,
            NoteRecord {
                title: req.title,
                content: req.content,
                archived: req.archived,
                category_ids: BTreeSet::new(),
                created_at_utc: now,
                updated_at_utc: now,
            },
        );
        for category_id in category_ids {
            state.link(id, category_id);
        }

        state
            .note(id)
            .ok_or_else(|| Error::Internal(format!("note {} vanished after insert", id)))
    }

    async fn update(&self, id: Uuid, req: NoteRequest) -> Result<Note> {
        let mut state = self.state.write().await;
        state.require_note(id)?;
        let category_ids = req.unique_category_ids();
        for category_id in &category_ids {
            state.require_category(*category_id)?;
        }

        state.detach_all(id);
        if let Some(record) = state.notes.get_mut(&id) {
            record.title = req.title;
            record.content = req.content;
            record.archived = req.archived;
            record.updated_at_utc = Utc::now();
        }
        for category_id in category_ids {
            state.link(id, category_id);
        }

        state.note(id).ok_or(Error::NoteNotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.require_note(id)?;
        state.detach_all(id);
        state.notes.remove(&id);
        Ok(())
    }

    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state.notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        record.archived = archived;
        record.updated_at_utc = Utc::now();
        Ok(())
    }

    async fn add_category(&self, note_id: Uuid, category_id: Uuid) -> Result<Note> {
        let mut state = self.state.write().await;
        state.require_note(note_id)?;
        state.require_category(category_id)?;
        state.link(note_id, category_id);
        state.note(note_id).ok_or(Error::NoteNotFound(note_id))
    }

    async fn remove_category(&self, note_id: Uuid, category_id: Uuid) -> Result<Note> {
        let mut state = self.state.write().await;
        state.require_note(note_id)?;
        state.require_category(category_id)?;
        state.unlink(note_id, category_id);
        state.note(note_id).ok_or(Error::NoteNotFound(note_id))
    }

    async fn list_by_category(
        &self,
        category_id: Uuid,
        filter: ArchiveFilter,
    ) -> Result<Vec<Note>> {
        let state = self.state.read().await;
        let category = state
            .categories
            .get(&category_id)
            .ok_or(Error::CategoryNotFound(category_id))?;
        let ids: Vec<Uuid> = category.note_ids.iter().copied().collect();
        Ok(state.collect_notes(ids, filter))
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state
            .categories
            .keys()
            .filter_map(|id| state.category(*id))
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.state.read().await.category(id))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        let name = name.trim();
        let state = self.state.read().await;
        Ok(state
            .categories
            .iter()
            .find(|(_, c)| c.name == name)
            .and_then(|(id, _)| state.category(*id)))
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.categories.contains_key(&id))
    }

    async fn create(&self, req: CategoryRequest) -> Result<Category> {
        let name = normalize_category_name(&req.name)?;
        let mut state = self.state.write().await;

        let existing = state
            .categories
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| *id);
        if let Some(id) = existing {
            return state.category(id).ok_or(Error::CategoryNotFound(id));
        }

        let id = new_v7();
        state.categories.insert(
            id,
            CategoryRecord {
                name,
                note_ids: BTreeSet::new(),
                created_at_utc: Utc::now(),
            },
        );
        state.category(id).ok_or(Error::CategoryNotFound(id))
    }

    async fn update(&self, id: Uuid, req: CategoryRequest) -> Result<Category> {
        let name = normalize_category_name(&req.name)?;
        let mut state = self.state.write().await;
        state.require_category(id)?;

        let taken = state
            .categories
            .iter()
            .any(|(other, c)| *other != id && c.name == name);
        if taken {
            return Err(Error::Conflict(format!(
                "A category named '{}' already exists",
                name
            )));
        }

        if let Some(record) = state.categories.get_mut(&id) {
            record.name = name;
        }
        state.category(id).ok_or(Error::CategoryNotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let attached: Vec<Uuid> = state
            .categories
            .get(&id)
            .ok_or(Error::CategoryNotFound(id))?
            .note_ids
            .iter()
            .copied()
            .collect();
        for note_id in attached {
            state.unlink(note_id, id);
        }
        state.categories.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> (InMemoryStore, Arc<dyn NoteRepository>, Arc<dyn CategoryRepository>) {
        let store = InMemoryStore::new();
        let notes: Arc<dyn NoteRepository> = Arc::new(store.clone());
        let categories: Arc<dyn CategoryRepository> = Arc::new(store.clone());
        (store, notes, categories)
    }

    fn note_req(title: &str, category_ids: Option<Vec<Uuid>>) -> NoteRequest {
        NoteRequest {
            title: title.to_string(),
            content: format!("{} body", title),
            archived: false,
            category_ids,
        }
    }

    async fn category(categories: &Arc<dyn CategoryRepository>, name: &str) -> Category {
        categories
            .create(CategoryRequest {
                name: name.to_string(),
            })
            .await
            .unwrap()
    }

    /// Both sides of the association must agree for every note and category.
    async fn assert_association_consistent(store: &InMemoryStore) {
        let state = store.state.read().await;
        for (note_id, note) in &state.notes {
            for category_id in &note.category_ids {
                let category = state.categories.get(category_id).expect("dangling category");
                assert!(category.note_ids.contains(note_id));
            }
        }
        for (category_id, category) in &state.categories {
            for note_id in &category.note_ids {
                let note = state.notes.get(note_id).expect("dangling note");
                assert!(note.category_ids.contains(category_id));
            }
        }
    }

    #[tokio::test]
    async fn test_create_category_is_idempotent_by_name() {
        let (_, _, categories) = stores();
        let first = category(&categories, "work").await;
        let second = category(&categories, "work").await;

        assert_eq!(first.id, second.id);
        assert_eq!(categories.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_category_rejects_blank_name() {
        let (_, _, categories) = stores();
        let err = categories
            .create(CategoryRequest {
                name: "  ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_insert_with_categories_links_both_sides() {
        let (store, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let home = category(&categories, "home").await;

        let note = notes
            .insert(note_req("plan", Some(vec![work.id, home.id, work.id])))
            .await
            .unwrap();

        assert_eq!(note.categories.len(), 2);
        // Ordered by name
        assert_eq!(note.categories[0].name, "home");
        assert_eq!(note.categories[1].name, "work");

        let under_work = notes
            .list_by_category(work.id, ArchiveFilter::All)
            .await
            .unwrap();
        assert_eq!(under_work.len(), 1);
        assert_eq!(under_work[0].id, note.id);
        assert_association_consistent(&store).await;
    }

    #[tokio::test]
    async fn test_insert_with_unknown_category_creates_nothing() {
        let (_, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let missing = Uuid::new_v4();

        let err = notes
            .insert(note_req("plan", Some(vec![work.id, missing])))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CategoryNotFound(id) if id == missing));
        assert!(notes.list(ArchiveFilter::All).await.unwrap().is_empty());
        assert!(notes
            .list_by_category(work.id, ArchiveFilter::All)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_fetch_missing_note() {
        let (_, notes, _) = stores();
        let id = Uuid::new_v4();
        assert!(matches!(notes.fetch(id).await, Err(Error::NoteNotFound(x)) if x == id));
    }

    #[tokio::test]
    async fn test_update_replaces_category_set() {
        let (store, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let home = category(&categories, "home").await;
        let note = notes
            .insert(note_req("plan", Some(vec![work.id])))
            .await
            .unwrap();

        let updated = notes
            .update(
                note.id,
                NoteRequest {
                    title: "new".to_string(),
                    content: "new body".to_string(),
                    archived: true,
                    category_ids: Some(vec![home.id]),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "new");
        assert!(updated.archived);
        assert_eq!(updated.category_ids(), vec![home.id]);
        // The dropped category still exists, just without this note
        assert!(categories.get(work.id).await.unwrap().is_some());
        assert!(notes
            .list_by_category(work.id, ArchiveFilter::All)
            .await
            .unwrap()
            .is_empty());
        assert_association_consistent(&store).await;
    }

    #[tokio::test]
    async fn test_update_keeps_shared_category_for_other_notes() {
        let (store, notes, categories) = stores();
        let a = category(&categories, "a").await;
        let b = category(&categories, "b").await;
        let first = notes
            .insert(note_req("first", Some(vec![a.id, b.id])))
            .await
            .unwrap();
        let second = notes
            .insert(note_req("second", Some(vec![a.id, b.id])))
            .await
            .unwrap();

        notes
            .update(first.id, note_req("first", Some(vec![b.id])))
            .await
            .unwrap();

        assert!(categories.get(a.id).await.unwrap().is_some());
        let under_a = notes
            .list_by_category(a.id, ArchiveFilter::All)
            .await
            .unwrap();
        assert_eq!(under_a.iter().map(|n| n.id).collect::<Vec<_>>(), vec![second.id]);
        let under_b = notes
            .list_by_category(b.id, ArchiveFilter::All)
            .await
            .unwrap();
        assert_eq!(under_b.len(), 2);
        assert_eq!(notes.fetch(second.id).await.unwrap().categories.len(), 2);
        assert_association_consistent(&store).await;
    }

    #[tokio::test]
    async fn test_update_with_unknown_category_leaves_note_untouched() {
        let (_, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let note = notes
            .insert(note_req("plan", Some(vec![work.id])))
            .await
            .unwrap();

        let err = notes
            .update(note.id, note_req("changed", Some(vec![Uuid::new_v4()])))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CategoryNotFound(_)));

        let after = notes.fetch(note.id).await.unwrap();
        assert_eq!(after, note);
    }

    #[tokio::test]
    async fn test_update_missing_note() {
        let (_, notes, _) = stores();
        let err = notes
            .update(Uuid::new_v4(), note_req("x", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoteNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_note_keeps_categories() {
        let (store, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let note = notes
            .insert(note_req("plan", Some(vec![work.id])))
            .await
            .unwrap();

        notes.delete(note.id).await.unwrap();

        assert!(categories.get(work.id).await.unwrap().is_some());
        assert!(notes
            .list_by_category(work.id, ArchiveFilter::All)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            notes.delete(note.id).await,
            Err(Error::NoteNotFound(_))
        ));
        assert_association_consistent(&store).await;
    }

    #[tokio::test]
    async fn test_archive_round_trip_restores_active_list() {
        let (_, notes, _) = stores();
        let note = notes.insert(note_req("plan", None)).await.unwrap();

        notes.archive(note.id).await.unwrap();
        assert!(notes.list(ArchiveFilter::Active).await.unwrap().is_empty());
        assert_eq!(notes.list(ArchiveFilter::Archived).await.unwrap().len(), 1);

        // Archiving twice is accepted
        notes.archive(note.id).await.unwrap();

        notes.unarchive(note.id).await.unwrap();
        let active = notes.list(ArchiveFilter::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, note.id);
        assert!(notes.list(ArchiveFilter::Archived).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_archive_missing_note() {
        let (_, notes, _) = stores();
        assert!(matches!(
            notes.archive(Uuid::new_v4()).await,
            Err(Error::NoteNotFound(_))
        ));
        assert!(matches!(
            notes.unarchive(Uuid::new_v4()).await,
            Err(Error::NoteNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_and_remove_category() {
        let (store, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let note = notes.insert(note_req("plan", None)).await.unwrap();

        let added = notes.add_category(note.id, work.id).await.unwrap();
        assert!(added.has_category(work.id));
        // Adding again does not duplicate
        let again = notes.add_category(note.id, work.id).await.unwrap();
        assert_eq!(again.categories.len(), 1);
        assert_association_consistent(&store).await;

        let removed = notes.remove_category(note.id, work.id).await.unwrap();
        assert!(removed.categories.is_empty());
        // Removing again is a no-op
        assert!(notes
            .remove_category(note.id, work.id)
            .await
            .unwrap()
            .categories
            .is_empty());
        assert_association_consistent(&store).await;
    }

    #[tokio::test]
    async fn test_add_category_missing_sides() {
        let (_, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let note = notes.insert(note_req("plan", None)).await.unwrap();

        assert!(matches!(
            notes.add_category(Uuid::new_v4(), work.id).await,
            Err(Error::NoteNotFound(_))
        ));
        assert!(matches!(
            notes.add_category(note.id, Uuid::new_v4()).await,
            Err(Error::CategoryNotFound(_))
        ));
        assert!(matches!(
            notes.remove_category(note.id, Uuid::new_v4()).await,
            Err(Error::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_category_filters_archived() {
        let (_, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let active = notes
            .insert(note_req("active", Some(vec![work.id])))
            .await
            .unwrap();
        let archived = notes
            .insert(NoteRequest {
                archived: true,
                ..note_req("archived", Some(vec![work.id]))
            })
            .await
            .unwrap();
        notes.insert(note_req("unfiled", None)).await.unwrap();

        let all = notes
            .list_by_category(work.id, ArchiveFilter::All)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let only_active = notes
            .list_by_category(work.id, ArchiveFilter::Active)
            .await
            .unwrap();
        assert_eq!(only_active.len(), 1);
        assert_eq!(only_active[0].id, active.id);

        let only_archived = notes
            .list_by_category(work.id, ArchiveFilter::Archived)
            .await
            .unwrap();
        assert_eq!(only_archived.len(), 1);
        assert_eq!(only_archived[0].id, archived.id);
    }

    #[tokio::test]
    async fn test_list_by_missing_category() {
        let (_, notes, _) = stores();
        assert!(matches!(
            notes
                .list_by_category(Uuid::new_v4(), ArchiveFilter::All)
                .await,
            Err(Error::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (_, notes, _) = stores();
        let first = notes.insert(note_req("first", None)).await.unwrap();
        let second = notes.insert(note_req("second", None)).await.unwrap();

        let listed = notes.list(ArchiveFilter::All).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_rename_category() {
        let (_, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let home = category(&categories, "home").await;
        let note = notes
            .insert(note_req("plan", Some(vec![work.id])))
            .await
            .unwrap();

        let renamed = categories
            .update(
                work.id,
                CategoryRequest {
                    name: "office".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.id, work.id);
        assert_eq!(renamed.name, "office");
        assert_eq!(notes.fetch(note.id).await.unwrap().categories[0].name, "office");
        assert_eq!(
            categories.get_by_name("office").await.unwrap().map(|c| c.id),
            Some(work.id)
        );

        let conflict = categories
            .update(
                work.id,
                CategoryRequest {
                    name: home.name.clone(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(conflict, Error::Conflict(_)));

        let missing = categories
            .update(
                Uuid::new_v4(),
                CategoryRequest {
                    name: "x".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(missing, Error::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_category_keeps_notes() {
        let (store, notes, categories) = stores();
        let work = category(&categories, "work").await;
        let note = notes
            .insert(note_req("plan", Some(vec![work.id])))
            .await
            .unwrap();

        categories.delete(work.id).await.unwrap();

        let after = notes.fetch(note.id).await.unwrap();
        assert!(after.categories.is_empty());
        assert!(matches!(
            categories.delete(work.id).await,
            Err(Error::CategoryNotFound(_))
        ));
        assert_association_consistent(&store).await;
    }
}
