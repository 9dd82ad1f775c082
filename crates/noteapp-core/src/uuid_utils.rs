//! UUID v7 utilities for time-ordered identifiers.
//!
//! Notes and categories are keyed by UUIDv7, which embeds a millisecond
//! timestamp in the first 48 bits. Sorting by id therefore sorts by
//! creation time, which the in-memory store relies on for list ordering.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// # Example
///
/// ```
/// use noteapp_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// // IDs generated later will be lexicographically greater
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Check if a UUID is version 7.
#[inline]
pub fn is_v7(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 7
}
