//! Content Store & Auth Tests
//!
//! Coverage of the snippet store accessors (dedup, ordering, caps,
//! truncation), the session pointer, JSON-file persistence across reopen,
//! and account registration/login on top of the store.
//!
//! Run with: cargo test --test store_tests

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use tempfile::TempDir;

use clipvault::{
    AuthError, Authenticator, ContentItem, ContentStore, JsonFileStore, ManualClock, MemoryKvStore,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn day_zero() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn setup() -> (ContentStore, Arc<ManualClock>) {
    let kv = Arc::new(MemoryKvStore::new());
    let clock = Arc::new(ManualClock::new(day_zero()));
    let store = ContentStore::new(kv, clock.clone());
    (store, clock)
}

fn texts(items: &[ContentItem]) -> Vec<&str> {
    items.iter().map(|i| i.text()).collect()
}

// ============================================================================
// APPEND SEMANTICS
// ============================================================================

#[test]
fn test_append_prepends_newest_first() {
    let (store, _clock) = setup();
    assert!(store.append("alice", "first").unwrap());
    assert!(store.append("alice", "second").unwrap());

    assert_eq!(
        texts(&store.load_content("alice").unwrap()),
        vec!["second", "first"]
    );
}

#[test]
fn test_append_stamps_current_time() {
    let (store, clock) = setup();
    store.append("alice", "early").unwrap();
    clock.advance(ChronoDuration::hours(2));
    store.append("alice", "late").unwrap();

    let items = store.load_content("alice").unwrap();
    assert_eq!(items[0].timestamp(), Some(day_zero() + ChronoDuration::hours(2)));
    assert_eq!(items[1].timestamp(), Some(day_zero()));
}

#[test]
fn test_append_skips_blank_and_duplicate() {
    let (store, _clock) = setup();
    assert!(!store.append("alice", "   ").unwrap());
    assert!(!store.append("alice", "").unwrap());

    assert!(store.append("alice", "snippet").unwrap());
    assert!(!store.append("alice", "snippet").unwrap());
    assert_eq!(store.load_content("alice").unwrap().len(), 1);
}

#[test]
fn test_append_truncates_to_character_limit() {
    let (store, _clock) = setup();
    let long = "é".repeat(10_500);
    store.append("alice", &long).unwrap();

    let items = store.load_content("alice").unwrap();
    assert_eq!(items[0].text().chars().count(), 10_000);
}

#[test]
fn test_sequence_capped_at_1000_items() {
    let (store, _clock) = setup();
    for i in 0..=1000 {
        store.append("alice", &format!("snippet {i}")).unwrap();
    }

    let items = store.load_content("alice").unwrap();
    assert_eq!(items.len(), 1000);
    // Newest survives, the oldest fell off the end
    assert_eq!(items[0].text(), "snippet 1000");
    assert_eq!(items[999].text(), "snippet 1");
}

#[test]
fn test_legacy_bare_string_items_decode() {
    let (store, _clock) = setup();
    store
        .kv()
        .set("clipboard_data_alice", r#"["plain", "strings"]"#)
        .unwrap();

    let items = store.load_content("alice").unwrap();
    assert_eq!(texts(&items), vec!["plain", "strings"]);
    assert!(items[0].timestamp().is_none());
}

// ============================================================================
// DELETE / CLEAR
// ============================================================================

#[test]
fn test_delete_by_index() {
    let (store, _clock) = setup();
    store.append("alice", "a").unwrap();
    store.append("alice", "b").unwrap();
    store.append("alice", "c").unwrap();

    store.delete_content("alice", 1).unwrap();
    assert_eq!(texts(&store.load_content("alice").unwrap()), vec!["c", "a"]);

    assert!(store.delete_content("alice", 5).is_err());
}

#[test]
fn test_clear_removes_sequence_entirely() {
    let (store, _clock) = setup();
    store.append("alice", "snippet").unwrap();
    store.clear_content("alice").unwrap();

    assert!(store.load_content("alice").unwrap().is_empty());
    assert!(store.content_usernames().unwrap().is_empty());
}

// ============================================================================
// USER TABLE & SESSION POINTER
// ============================================================================

#[test]
fn test_save_user_upserts() {
    let (store, _clock) = setup();
    store.save_user("alice", "hash-1").unwrap();
    store.save_user("alice", "hash-2").unwrap();

    let users = store.users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users["alice"].password_hash, "hash-2");
}

#[test]
fn test_current_user_round_trip() {
    let (store, _clock) = setup();
    store.save_user("alice", "hash").unwrap();
    let record = store.users().unwrap()["alice"].clone();

    assert!(store.current_user().unwrap().is_none());
    store.set_current_user(Some(&record)).unwrap();
    assert_eq!(store.current_user().unwrap(), Some(record));
    store.set_current_user(None).unwrap();
    assert!(store.current_user().unwrap().is_none());
}

// ============================================================================
// FILE-BACKED PERSISTENCE
// ============================================================================

#[test]
fn test_json_file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.json");
    let clock = Arc::new(ManualClock::new(day_zero()));

    {
        let kv = Arc::new(JsonFileStore::open(path.clone()).unwrap());
        let store = ContentStore::new(kv, clock.clone());
        store.save_user("alice", "hash").unwrap();
        store.append("alice", "persisted").unwrap();
    }

    let kv = Arc::new(JsonFileStore::open(path).unwrap());
    let store = ContentStore::new(kv, clock);
    assert_eq!(store.users().unwrap().len(), 1);
    assert_eq!(
        texts(&store.load_content("alice").unwrap()),
        vec!["persisted"]
    );
}

// ============================================================================
// AUTH
// ============================================================================

#[test]
fn test_register_login_logout() {
    let (store, _clock) = setup();
    let auth = Authenticator::new(store);

    let record = auth.register("alice", "s3cret-pass").unwrap();
    assert_eq!(record.username, "alice");
    // Stored hash is a PHC string, never the raw password
    assert!(record.password_hash.starts_with("$argon2"));

    // Registration signs the user in
    assert_eq!(auth.current_user().unwrap().unwrap().username, "alice");

    auth.logout().unwrap();
    assert!(auth.current_user().unwrap().is_none());

    let back = auth.login("alice", "s3cret-pass").unwrap();
    assert_eq!(back.username, "alice");
    assert_eq!(auth.current_user().unwrap().unwrap().username, "alice");
}

#[test]
fn test_duplicate_registration_rejected() {
    let (store, _clock) = setup();
    let auth = Authenticator::new(store);

    auth.register("alice", "s3cret-pass").unwrap();
    assert!(matches!(
        auth.register("alice", "another-pass"),
        Err(AuthError::UserExists(_))
    ));
}

#[test]
fn test_login_failures() {
    let (store, _clock) = setup();
    let auth = Authenticator::new(store);
    auth.register("alice", "s3cret-pass").unwrap();

    assert!(matches!(
        auth.login("alice", "wrong-pass"),
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.login("nobody", "s3cret-pass"),
        Err(AuthError::UnknownUser(_))
    ));
}

#[test]
fn test_register_rejects_invalid_input() {
    let (store, _clock) = setup();
    let auth = Authenticator::new(store);

    assert!(matches!(
        auth.register("", "s3cret-pass"),
        Err(AuthError::InvalidInput(_))
    ));
    assert!(matches!(
        auth.register("bad name!", "s3cret-pass"),
        Err(AuthError::InvalidInput(_))
    ));
    assert!(matches!(
        auth.register("alice", ""),
        Err(AuthError::InvalidInput(_))
    ));
}
