//! Tests for Engine
//!
//! These tests verify:
//! - Each control-plane request maps to the right status token
//! - Session gating (E_USR) for group operations
//! - Membership checks on the data-plane operations

use msgboard::protocol::{CommandKind, ControlReply, GroupTarget, Request, Status};
use msgboard::{BoardError, Config, Engine, Gid, MessageText, Mid, Password, Uid};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn uid(s: &str) -> Uid {
    s.parse().unwrap()
}

fn pwd(s: &str) -> Password {
    s.parse().unwrap()
}

fn gid(n: u8) -> Gid {
    Gid::new(n).unwrap()
}

fn status(engine: &Engine, request: Request) -> Status {
    engine
        .execute(request)
        .status_code()
        .expect("expected a status reply")
}

fn register(engine: &Engine, u: &str) -> Status {
    status(engine, Request::Register { uid: uid(u), password: pwd("password") })
}

fn login(engine: &Engine, u: &str) -> Status {
    status(engine, Request::Login { uid: uid(u), password: pwd("password") })
}

fn create_group(engine: &Engine, u: &str, name: &str) -> Status {
    status(
        engine,
        Request::Subscribe {
            uid: uid(u),
            target: GroupTarget::Create,
            name: name.parse().unwrap(),
        },
    )
}

/// Registered, logged-in user owning group 01 "news"
fn setup_active_engine() -> (TempDir, Engine) {
    let (temp, engine) = setup_temp_engine();
    register(&engine, "12345");
    login(&engine, "12345");
    assert_eq!(create_group(&engine, "12345", "news"), Status::New(gid(1)));
    (temp, engine)
}

// =============================================================================
// Users
// =============================================================================

#[test]
fn test_engine_register_and_duplicate() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(register(&engine, "12345"), Status::Ok);
    assert_eq!(register(&engine, "12345"), Status::Dup);
}

#[test]
fn test_engine_login_requires_matching_password() {
    let (_temp, engine) = setup_temp_engine();
    register(&engine, "12345");

    let wrong = Request::Login { uid: uid("12345"), password: pwd("wrongpwd") };
    assert_eq!(status(&engine, wrong), Status::Nok);
    assert_eq!(login(&engine, "99999"), Status::Nok);
    assert_eq!(login(&engine, "12345"), Status::Ok);
}

#[test]
fn test_engine_logout() {
    let (_temp, engine) = setup_temp_engine();
    register(&engine, "12345");
    let logout = || Request::Logout { uid: uid("12345"), password: pwd("password") };

    // Never logged in
    assert_eq!(status(&engine, logout()), Status::Nok);

    login(&engine, "12345");
    assert_eq!(status(&engine, logout()), Status::Ok);
    assert_eq!(status(&engine, logout()), Status::Nok);
}

#[test]
fn test_engine_unregister() {
    let (_temp, engine) = setup_active_engine();
    let unregister = |p: &str| Request::Unregister { uid: uid("12345"), password: pwd(p) };

    assert_eq!(status(&engine, unregister("wrongpwd")), Status::Nok);
    assert_eq!(status(&engine, unregister("password")), Status::Ok);
    assert_eq!(status(&engine, unregister("password")), Status::Nok);

    // The group survives, without its creator
    assert!(engine.store().group_exists(gid(1)));
    assert!(engine.list_members(gid(1)).unwrap().is_empty());
}

// =============================================================================
// Groups
// =============================================================================

#[test]
fn test_engine_group_ops_require_login() {
    let (_temp, engine) = setup_temp_engine();
    register(&engine, "12345");

    // Registered but logged out
    assert_eq!(create_group(&engine, "12345", "news"), Status::EUsr);
    // Never registered
    assert_eq!(create_group(&engine, "54321", "news"), Status::Nok);
    assert_eq!(
        status(
            &engine,
            Request::Subscribe {
                uid: uid("54321"),
                target: GroupTarget::Existing(gid(1)),
                name: "news".parse().unwrap(),
            }
        ),
        Status::Nok
    );
    assert_eq!(
        status(&engine, Request::Unsubscribe { uid: uid("54321"), gid: gid(1) }),
        Status::EUsr
    );
    assert_eq!(
        status(&engine, Request::Unsubscribe { uid: uid("12345"), gid: gid(1) }),
        Status::EUsr
    );
    assert_eq!(
        status(&engine, Request::MyGroups { uid: uid("12345") }),
        Status::EUsr
    );
}

#[test]
fn test_engine_subscribe_existing_group() {
    let (_temp, engine) = setup_active_engine();
    register(&engine, "22222");
    login(&engine, "22222");
    let join = |g: u8, name: &str| Request::Subscribe {
        uid: uid("22222"),
        target: GroupTarget::Existing(gid(g)),
        name: name.parse().unwrap(),
    };

    assert_eq!(status(&engine, join(1, "sports")), Status::EGname);
    assert_eq!(status(&engine, join(2, "news")), Status::EGrp);
    assert_eq!(status(&engine, join(1, "news")), Status::Ok);
    assert!(engine.store().is_member(uid("22222"), gid(1)));
}

#[test]
fn test_engine_create_duplicate_name() {
    let (_temp, engine) = setup_active_engine();

    assert_eq!(create_group(&engine, "12345", "news"), Status::EGname);
    assert_eq!(create_group(&engine, "12345", "sports"), Status::New(gid(2)));
}

#[test]
fn test_engine_create_when_full() {
    let (_temp, engine) = setup_active_engine();
    for i in 2..=99 {
        assert_eq!(
            create_group(&engine, "12345", &format!("g{}", i)),
            Status::New(gid(i))
        );
    }

    assert_eq!(create_group(&engine, "12345", "extra"), Status::EFull);
}

#[test]
fn test_engine_unsubscribe() {
    let (_temp, engine) = setup_active_engine();
    let leave = |g: u8| Request::Unsubscribe { uid: uid("12345"), gid: gid(g) };

    assert_eq!(status(&engine, leave(5)), Status::EGrp);
    assert_eq!(status(&engine, leave(1)), Status::Ok);
    assert!(!engine.store().is_member(uid("12345"), gid(1)));
}

#[test]
fn test_engine_list_groups_and_my_groups() {
    let (_temp, engine) = setup_active_engine();
    create_group(&engine, "12345", "sports");
    engine.execute(Request::Unsubscribe { uid: uid("12345"), gid: gid(1) });

    match engine.execute(Request::ListGroups) {
        ControlReply::Groups { kind, groups } => {
            assert_eq!(kind, CommandKind::ListGroups);
            assert_eq!(groups.len(), 2);
        }
        other => panic!("unexpected reply {:?}", other),
    }

    match engine.execute(Request::MyGroups { uid: uid("12345") }) {
        ControlReply::Groups { kind, groups } => {
            assert_eq!(kind, CommandKind::MyGroups);
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].gid, gid(2));
            assert_eq!(groups[0].name.as_str(), "sports");
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

// =============================================================================
// Data Plane
// =============================================================================

#[test]
fn test_engine_post_and_retrieve() {
    let (_temp, engine) = setup_active_engine();
    let text = MessageText::new("hello").unwrap();

    let mid = engine.post(uid("12345"), gid(1), &text, None).unwrap();
    assert_eq!(mid, Mid::new(1).unwrap());

    let page = engine.retrieve(uid("12345"), gid(1), Mid::ZERO).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].author, uid("12345"));
    assert_eq!(page[0].text, text);
    assert!(page[0].file.is_none());
}

#[test]
fn test_engine_data_plane_requires_membership() {
    let (_temp, engine) = setup_active_engine();
    let text = MessageText::new("hi").unwrap();

    let outsider = engine.post(uid("22222"), gid(1), &text, None);
    assert!(matches!(outsider, Err(BoardError::NotSubscribed)));

    let missing = engine.retrieve(uid("12345"), gid(9), Mid::ZERO);
    assert!(matches!(missing, Err(BoardError::UnknownGroup)));

    assert!(matches!(
        engine.list_members(gid(9)),
        Err(BoardError::UnknownGroup)
    ));
}

#[test]
fn test_engine_persists_across_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let engine = Engine::open_path(temp.path()).unwrap();
        register(&engine, "12345");
        login(&engine, "12345");
        create_group(&engine, "12345", "news");
    }

    let engine = Engine::open_path(temp.path()).unwrap();
    assert_eq!(register(&engine, "12345"), Status::Dup);
    assert_eq!(create_group(&engine, "12345", "other"), Status::New(gid(2)));
    assert_eq!(engine.data_dir(), temp.path());
}
