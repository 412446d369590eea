//! Data-plane codec
//!
//! Field readers used by the per-connection state machine, plus the request
//! and reply encoders for `ULS` and `PST`. `RTV` pages are produced and
//! consumed by the retrieval engine.

use std::io::Read;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BoardError, Result};
use crate::model::{FileName, Gid, MessageText, Mid, Uid, MAX_FILE_SIZE_DIGITS, MAX_TEXT_LEN};
use crate::validation;

use super::{CommandKind, FrameReader, Plane};

// =============================================================================
// Server side: incremental field readers
// =============================================================================

/// Read the 3-letter command code and its trailing space
pub fn read_command_code<R: Read>(reader: &mut FrameReader<R>) -> Result<CommandKind> {
    let code = reader.read_field(3, b' ', "command code")?;
    CommandKind::from_request_code(&code)
        .filter(|kind| kind.plane() == Plane::Data)
        .ok_or_else(|| BoardError::malformed(format!("unknown data-plane command {:?}", code)))
}

/// Read `uuuuu ` (uid and its separating space)
pub fn read_uid_field<R: Read>(reader: &mut FrameReader<R>) -> Result<Uid> {
    reader.read_field(5, b' ', "UID")?.parse()
}

/// Read a two-digit gid followed by `terminator`
///
/// Returns the raw token so callers can decide whether an invalid id is
/// fatal or a domain rejection.
pub fn read_gid_field<R: Read>(reader: &mut FrameReader<R>, terminator: u8) -> Result<String> {
    reader.read_field(2, terminator, "GID")
}

/// Read the text size token (at most 3 digits, value at most 240)
pub fn read_text_size<R: Read>(reader: &mut FrameReader<R>) -> Result<usize> {
    let token = reader.read_spaced_token(3, "text size")?;
    if !validation::is_number(&token) {
        return Err(BoardError::malformed(format!("text size {:?} is not a number", token)));
    }
    let size: usize = token
        .parse()
        .map_err(|_| BoardError::malformed("text size out of range"))?;
    if size > MAX_TEXT_LEN {
        return Err(BoardError::malformed(format!(
            "text size {} exceeds {}",
            size, MAX_TEXT_LEN
        )));
    }
    Ok(size)
}

/// Read exactly `size` bytes of message text
pub fn read_text<R: Read>(reader: &mut FrameReader<R>, size: usize) -> Result<MessageText> {
    MessageText::new(reader.read_exact_bytes(size)?)
}

/// Read the file size token (at most 10 digits) and its trailing space
pub fn read_file_size<R: Read>(reader: &mut FrameReader<R>) -> Result<u64> {
    let token = reader.read_spaced_token(MAX_FILE_SIZE_DIGITS, "file size")?;
    if !validation::is_number(&token) {
        return Err(BoardError::malformed(format!("file size {:?} is not a number", token)));
    }
    token
        .parse()
        .map_err(|_| BoardError::malformed("file size out of range"))
}

/// Read the `mmmm\n` tail of a retrieve request
pub fn read_start_mid<R: Read>(reader: &mut FrameReader<R>) -> Result<Mid> {
    reader.read_field(4, b'\n', "MID")?.parse()
}

// =============================================================================
// Server side: replies
// =============================================================================

/// `RUL OK gid uid...\n`, or `RUL NOK\n` when there is no such group
pub fn encode_member_list(listing: Option<(Gid, &[Uid])>) -> Bytes {
    let code = CommandKind::ListMembers.reply_code();
    match listing {
        None => Bytes::from(format!("{} NOK\n", code)),
        Some((gid, members)) => {
            let mut buf = BytesMut::with_capacity(12 + members.len() * 6);
            buf.put_slice(format!("{} OK {}", code, gid).as_bytes());
            for uid in members {
                buf.put_slice(format!(" {}", uid).as_bytes());
            }
            buf.put_u8(b'\n');
            buf.freeze()
        }
    }
}

/// `RPT mid\n`, or `RPT NOK\n` when the post was rejected
pub fn encode_post_reply(mid: Option<Mid>) -> Bytes {
    let code = CommandKind::Post.reply_code();
    match mid {
        Some(mid) => Bytes::from(format!("{} {}\n", code, mid)),
        None => Bytes::from(format!("{} NOK\n", code)),
    }
}

// =============================================================================
// Client side: requests
// =============================================================================

/// `ULS gid\n`
pub fn encode_list_members(gid: Gid) -> Bytes {
    Bytes::from(format!("{} {}\n", CommandKind::ListMembers.request_code(), gid))
}

/// Everything of a post request that precedes the raw file bytes
///
/// Without a file the request is complete (newline included). With a file
/// the caller streams `fsize` bytes and then the final newline.
pub fn encode_post_header(
    uid: Uid,
    gid: Gid,
    text: &MessageText,
    file: Option<(&FileName, u64)>,
) -> Bytes {
    let mut buf = BytesMut::with_capacity(32 + text.len());
    buf.put_slice(
        format!(
            "{} {} {} {} ",
            CommandKind::Post.request_code(),
            uid,
            gid,
            text.len()
        )
        .as_bytes(),
    );
    buf.put_slice(text.as_bytes());
    match file {
        Some((name, size)) => buf.put_slice(format!(" {} {} ", name, size).as_bytes()),
        None => buf.put_u8(b'\n'),
    }
    buf.freeze()
}

/// `RTV uid gid mid\n`
pub fn encode_retrieve(uid: Uid, gid: Gid, start: Mid) -> Bytes {
    Bytes::from(format!(
        "{} {} {} {}\n",
        CommandKind::Retrieve.request_code(),
        uid,
        gid,
        start
    ))
}

// =============================================================================
// Client side: replies
// =============================================================================

/// Decoded `RUL` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberList {
    Members { gid: Gid, members: Vec<Uid> },
    UnknownGroup,
}

fn reply_line<'a>(line: &'a [u8], kind: CommandKind) -> Result<Vec<&'a str>> {
    let body = match line.split_last() {
        Some((b'\n', body)) => body,
        _ => return Err(BoardError::malformed("reply does not end with a newline")),
    };
    let text = std::str::from_utf8(body).map_err(|_| BoardError::malformed("reply is not ASCII"))?;
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.first() != Some(&kind.reply_code()) {
        return Err(BoardError::malformed(format!(
            "expected {} reply, got {:?}",
            kind.reply_code(),
            text
        )));
    }
    Ok(tokens)
}

/// Decode a complete `RUL` reply line
pub fn decode_member_list(line: &[u8]) -> Result<MemberList> {
    let tokens = reply_line(line, CommandKind::ListMembers)?;
    match tokens.get(1).copied() {
        Some("NOK") if tokens.len() == 2 => Ok(MemberList::UnknownGroup),
        Some("OK") => {
            let gid = tokens
                .get(2)
                .ok_or_else(|| BoardError::malformed("RUL OK without group id"))?
                .parse()?;
            let members = tokens[3..]
                .iter()
                .map(|uid| uid.parse())
                .collect::<Result<Vec<Uid>>>()?;
            Ok(MemberList::Members { gid, members })
        }
        _ => Err(BoardError::malformed("unexpected RUL status")),
    }
}

/// Decode a complete `RPT` reply line; None means `NOK`
pub fn decode_post_reply(line: &[u8]) -> Result<Option<Mid>> {
    let tokens = reply_line(line, CommandKind::Post)?;
    match tokens.as_slice() {
        [_, "NOK"] => Ok(None),
        [_, mid] => Ok(Some(mid.parse()?)),
        _ => Err(BoardError::malformed("unexpected RPT reply")),
    }
}
