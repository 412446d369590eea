//! Tests for the entity store
//!
//! These tests verify:
//! - User registration, login state and cascading deletion
//! - Group creation limits and subscriptions
//! - Message id allocation, rollback and paging

mod users;
mod messages;

use msgboard::storage::EntityStore;
use msgboard::{Gid, GroupName, Password, Uid};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

pub fn setup_temp_store() -> (TempDir, EntityStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = EntityStore::open(temp_dir.path()).unwrap();
    (temp_dir, store)
}

pub fn uid(s: &str) -> Uid {
    s.parse().unwrap()
}

pub fn pwd(s: &str) -> Password {
    s.parse().unwrap()
}

pub fn name(s: &str) -> GroupName {
    s.parse().unwrap()
}

pub fn gid(n: u8) -> Gid {
    Gid::new(n).unwrap()
}

/// Register `u` and create one group named `group`
pub fn store_with_group(u: &str, group: &str) -> (TempDir, EntityStore, Gid) {
    let (temp, store) = setup_temp_store();
    store.create_user(uid(u), &pwd("password")).unwrap();
    let gid = store.create_group(uid(u), &name(group)).unwrap();
    (temp, store, gid)
}
