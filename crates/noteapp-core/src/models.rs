//! Core data models for noteapp.
//!
//! These types are shared across all noteapp crates and represent
//! the core domain entities. JSON field names are camelCase, matching
//! what the web frontend consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maximum length of a category name, in characters.
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note together with the categories it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub archived: bool,
    /// Associated categories, ordered by name, never duplicated.
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(rename = "createdAt")]
    pub created_at_utc: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at_utc: DateTime<Utc>,
}

impl Note {
    /// Whether the note is associated with the given category.
    pub fn has_category(&self, category_id: Uuid) -> bool {
        self.categories.iter().any(|c| c.id == category_id)
    }

    /// Ids of the associated categories, in name order.
    pub fn category_ids(&self) -> Vec<Uuid> {
        self.categories.iter().map(|c| c.id).collect()
    }
}

/// Request body for creating or fully replacing a note.
///
/// Every field is optional on the wire, and an explicit `null` counts as
/// missing: text fields become empty strings and `archived` means active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub archived: bool,
    #[serde(default)]
    pub category_ids: Option<Vec<Uuid>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl NoteRequest {
    /// Requested category ids with duplicates removed, first occurrence wins.
    pub fn unique_category_ids(&self) -> Vec<Uuid> {
        let mut seen = std::collections::HashSet::new();
        self.category_ids
            .iter()
            .flatten()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Which notes a list operation returns, by archived state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFilter {
    /// Every note regardless of state.
    #[default]
    All,
    /// Notes with `archived = false`.
    Active,
    /// Notes with `archived = true`.
    Archived,
}

impl ArchiveFilter {
    /// The archived value to filter on, or `None` for no filter.
    pub fn archived(self) -> Option<bool> {
        match self {
            ArchiveFilter::All => None,
            ArchiveFilter::Active => Some(false),
            ArchiveFilter::Archived => Some(true),
        }
    }

    /// Whether a note with the given archived flag passes this filter.
    pub fn matches(self, archived: bool) -> bool {
        self.archived().map_or(true, |wanted| wanted == archived)
    }
}

impl std::fmt::Display for ArchiveFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArchiveFilter::All => "all",
            ArchiveFilter::Active => "active",
            ArchiveFilter::Archived => "archived",
        };
        f.write_str(s)
    }
}

// =============================================================================
// CATEGORY TYPES
// =============================================================================

/// A named category notes can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at_utc: DateTime<Utc>,
}

/// Request body for creating or renaming a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

/// Validate and normalize a category name.
///
/// Rules:
/// - Surrounding whitespace is trimmed
/// - The trimmed name must not be empty
/// - At most [`MAX_CATEGORY_NAME_LEN`] characters
pub fn normalize_category_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "Category name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "Category name must be {} characters or less",
            MAX_CATEGORY_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}
