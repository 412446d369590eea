//! Data-plane fields and replies

use msgboard::protocol::{
    decode_member_list, decode_post_reply, encode_list_members, encode_member_list,
    encode_post_header, encode_post_reply, encode_retrieve, read_command_code, read_file_size,
    read_gid_field, read_start_mid, read_text, read_text_size, read_uid_field, CommandKind,
    MemberList,
};
use msgboard::{FileName, MessageText};

use super::*;

// =============================================================================
// Field Readers
// =============================================================================

#[test]
fn test_read_post_fields_in_order() {
    let mut r = reader(b"PST 12345 01 11 hello\nworld notes.txt 3 abc\n");

    assert_eq!(read_command_code(&mut r).unwrap(), CommandKind::Post);
    assert_eq!(read_uid_field(&mut r).unwrap(), uid("12345"));
    assert_eq!(read_gid_field(&mut r, b' ').unwrap(), "01");
    let size = read_text_size(&mut r).unwrap();
    assert_eq!(size, 11);
    assert_eq!(read_text(&mut r, size).unwrap().as_bytes(), b"hello\nworld");

    // The separator after the text is left for the caller
    assert_eq!(remaining(&r), b" notes.txt 3 abc\n");
}

#[test]
fn test_read_command_code_rejects_control_codes() {
    assert!(read_command_code(&mut reader(b"REG 12345")).is_err());
    assert!(read_command_code(&mut reader(b"XYZ ")).is_err());
    assert!(read_command_code(&mut reader(b"ULS\n")).is_err());
    assert_eq!(
        read_command_code(&mut reader(b"RTV ")).unwrap(),
        CommandKind::Retrieve
    );
}

#[test]
fn test_read_text_size_bounds() {
    assert_eq!(read_text_size(&mut reader(b"240 ")).unwrap(), 240);
    assert_eq!(read_text_size(&mut reader(b"0 ")).unwrap(), 0);
    assert!(read_text_size(&mut reader(b"241 ")).is_err());
    assert!(read_text_size(&mut reader(b"1000 ")).is_err());
    assert!(read_text_size(&mut reader(b"1a ")).is_err());
    assert!(read_text_size(&mut reader(b"12\n")).is_err());
}

#[test]
fn test_read_file_size() {
    assert_eq!(read_file_size(&mut reader(b"9999999999 ")).unwrap(), 9_999_999_999);
    assert!(read_file_size(&mut reader(b"12345678901 ")).is_err());
    assert!(read_file_size(&mut reader(b" ")).is_err());
}

#[test]
fn test_read_start_mid() {
    assert_eq!(read_start_mid(&mut reader(b"0000\n")).unwrap(), Mid::ZERO);
    assert_eq!(read_start_mid(&mut reader(b"0042\n")).unwrap(), mid(42));
    assert!(read_start_mid(&mut reader(b"42\n")).is_err());
    assert!(read_start_mid(&mut reader(b"0042 ")).is_err());
}

#[test]
fn test_read_gid_field_keeps_raw_token() {
    assert_eq!(read_gid_field(&mut reader(b"00\n"), b'\n').unwrap(), "00");
    assert!(read_gid_field(&mut reader(b"1\n"), b'\n').is_err());
}

// =============================================================================
// Encoders
// =============================================================================

#[test]
fn test_encode_member_list() {
    let members = [uid("12345"), uid("54321")];

    assert_eq!(
        &encode_member_list(Some((gid(1), &members)))[..],
        b"RUL OK 01 12345 54321\n"
    );
    assert_eq!(&encode_member_list(Some((gid(1), &[])))[..], b"RUL OK 01\n");
    assert_eq!(&encode_member_list(None)[..], b"RUL NOK\n");
}

#[test]
fn test_encode_post_reply() {
    assert_eq!(&encode_post_reply(Some(mid(1)))[..], b"RPT 0001\n");
    assert_eq!(&encode_post_reply(None)[..], b"RPT NOK\n");
}

#[test]
fn test_encode_requests() {
    let text = MessageText::new("hi there").unwrap();
    let fname: FileName = "a.txt".parse().unwrap();

    assert_eq!(&encode_list_members(gid(9))[..], b"ULS 09\n");
    assert_eq!(
        &encode_post_header(uid("12345"), gid(1), &text, None)[..],
        b"PST 12345 01 8 hi there\n"
    );
    assert_eq!(
        &encode_post_header(uid("12345"), gid(1), &text, Some((&fname, 5)))[..],
        b"PST 12345 01 8 hi there a.txt 5 "
    );
    assert_eq!(
        &encode_retrieve(uid("12345"), gid(1), Mid::ZERO)[..],
        b"RTV 12345 01 0000\n"
    );
}

// =============================================================================
// Reply Decoders
// =============================================================================

#[test]
fn test_decode_member_list() {
    let listing = decode_member_list(b"RUL OK 03 11111 22222\n").unwrap();
    assert_eq!(
        listing,
        MemberList::Members {
            gid: gid(3),
            members: vec![uid("11111"), uid("22222")],
        }
    );

    assert_eq!(decode_member_list(b"RUL NOK\n").unwrap(), MemberList::UnknownGroup);
    assert!(decode_member_list(b"RUL OK 03").is_err());
    assert!(decode_member_list(b"RPT OK 03\n").is_err());
}

#[test]
fn test_decode_post_reply() {
    assert_eq!(decode_post_reply(b"RPT 0007\n").unwrap(), Some(mid(7)));
    assert_eq!(decode_post_reply(b"RPT NOK\n").unwrap(), None);
    assert!(decode_post_reply(b"RPT 7\n").is_err());
    assert!(decode_post_reply(b"RPT 0007 0008\n").is_err());
}
