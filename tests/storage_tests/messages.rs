//! Messages

use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::thread;

use msgboard::storage::PAGE_SIZE;
use msgboard::{BoardError, FileName, MessageText, Mid};

use super::*;

fn text(s: &str) -> MessageText {
    MessageText::new(s.as_bytes()).unwrap()
}

fn mid(n: u16) -> Mid {
    Mid::new(n).unwrap()
}

#[test]
fn test_first_message_id_is_0001() {
    let (_temp, store, gid) = store_with_group("12345", "news");

    assert_eq!(store.next_message_id(gid).unwrap().to_string(), "0001");
    let first = store.create_message(gid, uid("12345"), &text("hello"), None).unwrap();
    let second = store.create_message(gid, uid("12345"), &text("again"), None).unwrap();

    assert_eq!(first.to_string(), "0001");
    assert_eq!(second.to_string(), "0002");
    assert_eq!(store.list_groups().unwrap()[0].last_mid, mid(2));
}

#[test]
fn test_message_records_layout() {
    let (temp, store, gid) = store_with_group("12345", "news");

    store
        .create_message(gid, uid("12345"), &text("hello world"), None)
        .unwrap();

    let dir = temp.path().join("GROUPS/01/MSG/0001");
    assert_eq!(fs::read(dir.join("A U T H O R.txt")).unwrap(), b"12345\n");
    assert_eq!(fs::read(dir.join("T E X T.txt")).unwrap(), b"hello world");
}

#[test]
fn test_message_limit_after_9999() {
    let (temp, store, gid) = store_with_group("12345", "news");
    fs::create_dir_all(temp.path().join("GROUPS/01/MSG/9998")).unwrap();

    assert_eq!(store.next_message_id(gid).unwrap(), mid(9999));
    store.create_message(gid, uid("12345"), &text("last"), None).unwrap();

    assert!(matches!(store.next_message_id(gid), Err(BoardError::MessageLimit)));
    let result = store.create_message(gid, uid("12345"), &text("too many"), None);
    assert!(matches!(result, Err(BoardError::MessageLimit)));
}

#[test]
fn test_staged_file_moves_into_message() {
    let (temp, store, gid) = store_with_group("12345", "news");

    let mut staged = store.stage_upload().unwrap();
    staged.write_all(b"file contents\n with newline").unwrap();
    let staging_path = staged.path().to_path_buf();
    let fname: FileName = "notes.txt".parse().unwrap();

    let mid = store
        .create_message(gid, uid("12345"), &text("see file"), Some((fname, staged)))
        .unwrap();

    assert!(!staging_path.exists());
    let stored = temp.path().join("GROUPS/01/MSG/0001/notes.txt");
    assert_eq!(fs::read(stored).unwrap(), b"file contents\n with newline");

    let page = store.messages_from(gid, mid).unwrap();
    let file = page[0].file.as_ref().unwrap();
    assert_eq!(file.name.as_str(), "notes.txt");
    assert_eq!(file.size, 27);
}

#[test]
fn test_dropped_staged_file_is_removed() {
    let (_temp, store, _) = store_with_group("12345", "news");

    let mut staged = store.stage_upload().unwrap();
    staged.write_all(b"partial").unwrap();
    let path = staged.path().to_path_buf();
    assert!(path.exists());

    drop(staged);

    assert!(!path.exists());
}

#[test]
fn test_failed_message_is_rolled_back() {
    let (temp, store, gid) = store_with_group("12345", "news");

    let staged = store.stage_upload().unwrap();
    // Pull the staging record out from under the store so adoption fails
    fs::remove_file(staged.path()).unwrap();
    let fname: FileName = "data.bin".parse().unwrap();

    let result = store.create_message(gid, uid("12345"), &text("x"), Some((fname, staged)));

    assert!(result.is_err());
    assert!(!temp.path().join("GROUPS/01/MSG/0001").exists());
    assert_eq!(store.next_message_id(gid).unwrap(), mid(1));
}

#[test]
fn test_messages_from_is_capped_at_page_size() {
    let (_temp, store, gid) = store_with_group("12345", "news");
    for i in 0..25 {
        store
            .create_message(gid, uid("12345"), &text(&format!("m{}", i)), None)
            .unwrap();
    }

    let page = store.messages_from(gid, Mid::ZERO).unwrap();
    assert_eq!(page.len(), PAGE_SIZE);
    assert_eq!(page[0].mid, mid(1));
    assert_eq!(page[19].mid, mid(20));

    let tail = store.messages_from(gid, mid(21)).unwrap();
    assert_eq!(tail.len(), 5);
    assert_eq!(tail[0].mid, mid(21));
}

#[test]
fn test_messages_from_past_end_is_empty() {
    let (_temp, store, gid) = store_with_group("12345", "news");
    store.create_message(gid, uid("12345"), &text("only"), None).unwrap();

    assert!(store.messages_from(gid, mid(2)).unwrap().is_empty());
}

#[test]
fn test_messages_without_author_are_skipped() {
    let (temp, store, gid) = store_with_group("12345", "news");
    store.create_message(gid, uid("12345"), &text("one"), None).unwrap();
    store.create_message(gid, uid("12345"), &text("two"), None).unwrap();
    fs::remove_file(temp.path().join("GROUPS/01/MSG/0001/A U T H O R.txt")).unwrap();

    let page = store.messages_from(gid, Mid::ZERO).unwrap();

    assert_eq!(page.len(), 1);
    assert_eq!(page[0].mid, mid(2));
    assert_eq!(page[0].text.as_bytes(), b"two");
}

#[test]
fn test_concurrent_posts_get_distinct_ids() {
    let (_temp, store, gid) = store_with_group("12345", "news");
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..10)
                    .map(|i| {
                        store
                            .create_message(gid, uid("12345"), &text(&format!("{}-{}", t, i)), None)
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<Mid> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 80);
    assert_eq!(ids.last().copied(), Some(mid(80)));
}
