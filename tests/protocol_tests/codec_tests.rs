//! Control-plane datagrams

use msgboard::protocol::{
    decode_control_reply, decode_control_request, encode_control_reply, encode_control_request,
    malformed_reply, CommandKind, ControlReply, GroupSummary, GroupTarget, Request, Status,
};

use super::*;

// =============================================================================
// Requests
// =============================================================================

#[test]
fn test_decode_register() {
    let request = decode_control_request(b"REG 12345 password\n").unwrap();

    assert_eq!(
        request,
        Request::Register {
            uid: uid("12345"),
            password: "password".parse().unwrap(),
        }
    );
}

#[test]
fn test_decode_subscribe_create() {
    let request = decode_control_request(b"GSR 12345 00 news\n").unwrap();

    match request {
        Request::Subscribe { uid: u, target, name } => {
            assert_eq!(u, uid("12345"));
            assert_eq!(target, GroupTarget::Create);
            assert_eq!(name.as_str(), "news");
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[test]
fn test_encode_requests() {
    let subscribe = Request::Subscribe {
        uid: uid("12345"),
        target: GroupTarget::Existing(gid(4)),
        name: "sports".parse().unwrap(),
    };
    assert_eq!(&encode_control_request(&subscribe)[..], b"GSR 12345 04 sports\n");
    assert_eq!(&encode_control_request(&Request::ListGroups)[..], b"GLS\n");
    assert_eq!(
        &encode_control_request(&Request::MyGroups { uid: uid("00001") })[..],
        b"GLM 00001\n"
    );
}

#[test]
fn test_request_framing_is_strict() {
    let rejected: [&[u8]; 7] = [
        b"REG 12345 password",
        b"REG 12345 password\n\n",
        b"REG  12345 password\n",
        b"REG 12345 password \n",
        b"REG 12345 pass\n",
        b"GLS extra\n",
        b"\n",
    ];
    for datagram in rejected {
        assert!(
            decode_control_request(datagram).is_err(),
            "accepted {:?}",
            String::from_utf8_lossy(datagram)
        );
    }
}

#[test]
fn test_data_plane_codes_rejected_over_udp() {
    assert!(decode_control_request(b"ULS 01\n").is_err());
    assert!(decode_control_request(b"RTV 12345 01 0001\n").is_err());
}

#[test]
fn test_malformed_reply_selection() {
    assert_eq!(
        malformed_reply(b"REG 1234 password\n"),
        ControlReply::status(CommandKind::Register, Status::Nok)
    );
    assert_eq!(
        malformed_reply(b"GUR 12345 xx\n"),
        ControlReply::status(CommandKind::Unsubscribe, Status::Nok)
    );
    assert_eq!(malformed_reply(b"GLS junk\n"), ControlReply::Error);
    assert_eq!(malformed_reply(b"GLM 1\n"), ControlReply::Error);
    assert_eq!(malformed_reply(b"XYZ\n"), ControlReply::Error);
    assert_eq!(malformed_reply(b"\xff\xfe"), ControlReply::Error);
}

// =============================================================================
// Replies
// =============================================================================

#[test]
fn test_encode_status_replies() {
    let new = ControlReply::status(CommandKind::Subscribe, Status::New(gid(3)));
    let dup = ControlReply::status(CommandKind::Register, Status::Dup);

    assert_eq!(&encode_control_reply(&new)[..], b"RGS NEW 03\n");
    assert_eq!(&encode_control_reply(&dup)[..], b"RRG DUP\n");
    assert_eq!(&encode_control_reply(&ControlReply::Error)[..], b"ERR\n");
}

#[test]
fn test_encode_group_listing() {
    let groups = vec![
        GroupSummary {
            gid: gid(1),
            name: "news".parse().unwrap(),
            last_mid: mid(12),
        },
        GroupSummary {
            gid: gid(2),
            name: "empty".parse().unwrap(),
            last_mid: Mid::ZERO,
        },
    ];
    let reply = ControlReply::groups(CommandKind::ListGroups, groups.clone());

    let bytes = encode_control_reply(&reply);
    assert_eq!(&bytes[..], b"RGL 2 01 news 0012 02 empty 0000\n");

    let decoded = decode_control_reply(&bytes, CommandKind::ListGroups).unwrap();
    assert_eq!(decoded, ControlReply::groups(CommandKind::ListGroups, groups));
}

#[test]
fn test_decode_empty_listing_and_status() {
    let empty = decode_control_reply(b"RGM 0\n", CommandKind::MyGroups).unwrap();
    assert_eq!(empty, ControlReply::groups(CommandKind::MyGroups, Vec::new()));

    let rejected = decode_control_reply(b"RGM E_USR\n", CommandKind::MyGroups).unwrap();
    assert_eq!(rejected.status_code(), Some(Status::EUsr));
}

#[test]
fn test_decode_reply_checks_command() {
    assert!(decode_control_reply(b"RLO OK\n", CommandKind::Register).is_err());
    assert!(decode_control_reply(b"RRG MAYBE\n", CommandKind::Register).is_err());
    assert!(decode_control_reply(b"RRG OK extra\n", CommandKind::Register).is_err());
    assert!(decode_control_reply(b"RGL 2 01 news 0001\n", CommandKind::ListGroups).is_err());
    assert_eq!(
        decode_control_reply(b"ERR\n", CommandKind::Login).unwrap(),
        ControlReply::Error
    );
}

#[test]
fn test_decode_new_group_status() {
    let reply = decode_control_reply(b"RGS NEW 07\n", CommandKind::Subscribe).unwrap();

    assert_eq!(reply.status_code(), Some(Status::New(gid(7))));
    assert!(decode_control_reply(b"RGS NEW\n", CommandKind::Subscribe).is_err());
}

#[test]
fn test_decode_listing_with_huge_count() {
    // count * 3 would wrap around to the number of fields carried
    let reply = decode_control_reply(b"RGL 6148914691236517206 a b\n", CommandKind::ListGroups);
    assert!(matches!(reply, Err(msgboard::BoardError::Malformed(_))));

    let reply = decode_control_reply(
        format!("RGM {} 01 news 0001\n", usize::MAX).as_bytes(),
        CommandKind::MyGroups,
    );
    assert!(matches!(reply, Err(msgboard::BoardError::Malformed(_))));
}
