//! User records

use std::fs;

use msgboard::storage::EntityStore;
use msgboard::BoardError;

use super::*;

#[test]
fn test_create_user_writes_password_record() {
    let (temp, store) = setup_temp_store();

    store.create_user(uid("12345"), &pwd("password")).unwrap();

    let record = temp.path().join("USERS/12345/12345_pass.txt");
    assert_eq!(fs::read(record).unwrap(), b"password");
    assert!(store.user_exists(uid("12345")));
}

#[test]
fn test_duplicate_register_keeps_original_password() {
    let (_temp, store) = setup_temp_store();

    store.create_user(uid("12345"), &pwd("password")).unwrap();
    let second = store.create_user(uid("12345"), &pwd("otherpwd"));

    assert!(matches!(second, Err(BoardError::Duplicate)));
    assert!(store.verify_password(uid("12345"), &pwd("password")).unwrap());
    assert!(!store.verify_password(uid("12345"), &pwd("otherpwd")).unwrap());
}

#[test]
fn test_register_repairs_user_without_password() {
    let (temp, store) = setup_temp_store();
    fs::create_dir_all(temp.path().join("USERS/54321")).unwrap();

    assert!(!store.user_exists(uid("54321")));
    store.create_user(uid("54321"), &pwd("abcd1234")).unwrap();

    assert!(store.user_exists(uid("54321")));
    assert!(store.verify_password(uid("54321"), &pwd("abcd1234")).unwrap());
}

#[test]
fn test_verify_password_unknown_user() {
    let (_temp, store) = setup_temp_store();

    let result = store.verify_password(uid("11111"), &pwd("password"));

    assert!(matches!(result, Err(BoardError::UnknownUser)));
}

#[test]
fn test_login_logout_round_trip() {
    let (_temp, store) = setup_temp_store();
    store.create_user(uid("12345"), &pwd("password")).unwrap();

    store.set_logged_in(uid("12345")).unwrap();
    assert!(store.is_logged_in(uid("12345")));

    store.set_logged_out(uid("12345")).unwrap();
    assert!(!store.is_logged_in(uid("12345")));
}

#[test]
fn test_logout_without_login_fails() {
    let (_temp, store) = setup_temp_store();
    store.create_user(uid("12345"), &pwd("password")).unwrap();

    let result = store.set_logged_out(uid("12345"));

    assert!(matches!(result, Err(BoardError::NotLoggedIn)));
}

#[test]
fn test_login_state_survives_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let store = EntityStore::open(temp.path()).unwrap();
        store.create_user(uid("12345"), &pwd("password")).unwrap();
        store.set_logged_in(uid("12345")).unwrap();
    }

    let store = EntityStore::open(temp.path()).unwrap();
    assert!(store.is_logged_in(uid("12345")));
}

#[test]
fn test_delete_user_removes_subscriptions() {
    let (temp, store, first) = store_with_group("12345", "news");
    let second = store.create_group(uid("12345"), &name("sports")).unwrap();

    store.delete_user(uid("12345"), &pwd("password")).unwrap();

    assert!(!store.user_exists(uid("12345")));
    assert!(!temp.path().join("USERS/12345").exists());
    assert!(!store.is_member(uid("12345"), first));
    assert!(!store.is_member(uid("12345"), second));
    // Groups outlive their creator
    assert!(store.group_exists(first));
}

#[test]
fn test_delete_user_wrong_password() {
    let (_temp, store) = setup_temp_store();
    store.create_user(uid("12345"), &pwd("password")).unwrap();

    let result = store.delete_user(uid("12345"), &pwd("wrongpwd"));

    assert!(matches!(result, Err(BoardError::WrongPassword)));
    assert!(store.user_exists(uid("12345")));
}

#[test]
fn test_delete_unknown_user() {
    let (_temp, store) = setup_temp_store();

    let result = store.delete_user(uid("12345"), &pwd("password"));

    assert!(matches!(result, Err(BoardError::UnknownUser)));
}
