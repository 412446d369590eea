//! Control-plane codec
//!
//! Encoding and decoding functions for UDP datagrams.
//!
//! ## Datagram Format
//! ```text
//! REG uid pwd\n            → RRG OK|DUP|NOK\n
//! GSR uid gid gname\n      → RGS OK|NEW gid|E_FULL|E_USR|E_GRP|E_GNAME|NOK\n
//! GLS\n                    → RGL n[ gid gname mid]*n\n
//! ```
//! A datagram must end with exactly one newline and contain no other.
//! Tokens are separated by exactly one space.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BoardError, Result};
use crate::model::{Gid, Mid};

use super::{CommandKind, ControlReply, GroupSummary, GroupTarget, Plane, Request, Status};

/// Reply sent for unparseable datagrams
pub const ERR_REPLY: &[u8] = b"ERR\n";

/// Largest datagram accepted or produced on the control plane
pub const MAX_CONTROL_DATAGRAM: usize = 4096;

// =============================================================================
// Framing
// =============================================================================

/// Strip the single trailing newline and split into tokens
fn tokenize(bytes: &[u8]) -> Result<Vec<&str>> {
    let body = match bytes.split_last() {
        Some((b'\n', body)) => body,
        _ => return Err(BoardError::malformed("datagram does not end with a newline")),
    };
    if body.contains(&b'\n') {
        return Err(BoardError::malformed("datagram contains more than one newline"));
    }
    let line = std::str::from_utf8(body)
        .map_err(|_| BoardError::malformed("datagram is not valid ASCII"))?;
    if line.is_empty() {
        return Err(BoardError::malformed("empty datagram"));
    }
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(BoardError::malformed("empty token"));
    }
    Ok(tokens)
}

fn expect_tokens(tokens: &[&str], count: usize, kind: CommandKind) -> Result<()> {
    if tokens.len() != count {
        return Err(BoardError::malformed(format!(
            "{}: expected {} tokens, got {}",
            kind.request_code(),
            count,
            tokens.len()
        )));
    }
    Ok(())
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Decode a control-plane request datagram
pub fn decode_control_request(bytes: &[u8]) -> Result<Request> {
    let tokens = tokenize(bytes)?;
    let kind = CommandKind::from_request_code(tokens[0])
        .filter(|kind| kind.plane() == Plane::Control)
        .ok_or_else(|| BoardError::malformed(format!("unknown command {:?}", tokens[0])))?;

    let request = match kind {
        CommandKind::Register | CommandKind::Unregister | CommandKind::Login | CommandKind::Logout => {
            expect_tokens(&tokens, 3, kind)?;
            let uid = tokens[1].parse()?;
            let password = tokens[2].parse()?;
            match kind {
                CommandKind::Register => Request::Register { uid, password },
                CommandKind::Unregister => Request::Unregister { uid, password },
                CommandKind::Login => Request::Login { uid, password },
                _ => Request::Logout { uid, password },
            }
        }
        CommandKind::ListGroups => {
            expect_tokens(&tokens, 1, kind)?;
            Request::ListGroups
        }
        CommandKind::Subscribe => {
            expect_tokens(&tokens, 4, kind)?;
            let uid = tokens[1].parse()?;
            let target = if tokens[2] == "00" {
                GroupTarget::Create
            } else {
                GroupTarget::Existing(tokens[2].parse()?)
            };
            let name = tokens[3].parse()?;
            Request::Subscribe { uid, target, name }
        }
        CommandKind::Unsubscribe => {
            expect_tokens(&tokens, 3, kind)?;
            Request::Unsubscribe {
                uid: tokens[1].parse()?,
                gid: tokens[2].parse()?,
            }
        }
        CommandKind::MyGroups => {
            expect_tokens(&tokens, 2, kind)?;
            Request::MyGroups {
                uid: tokens[1].parse()?,
            }
        }
        CommandKind::ListMembers | CommandKind::Post | CommandKind::Retrieve => {
            return Err(BoardError::malformed(format!(
                "{} is not a control-plane command",
                kind.request_code()
            )));
        }
    };

    Ok(request)
}

/// Encode a control-plane request datagram
pub fn encode_control_request(request: &Request) -> Bytes {
    let mut buf = BytesMut::with_capacity(40);
    buf.put_slice(request.kind().request_code().as_bytes());

    let fields = match request {
        Request::Register { uid, password }
        | Request::Unregister { uid, password }
        | Request::Login { uid, password }
        | Request::Logout { uid, password } => format!(" {} {}", uid, password),
        Request::ListGroups => String::new(),
        Request::Subscribe { uid, target, name } => {
            let gid = match target {
                GroupTarget::Create => "00".to_string(),
                GroupTarget::Existing(gid) => gid.to_string(),
            };
            format!(" {} {} {}", uid, gid, name)
        }
        Request::Unsubscribe { uid, gid } => format!(" {} {}", uid, gid),
        Request::MyGroups { uid } => format!(" {}", uid),
    };

    buf.put_slice(fields.as_bytes());
    buf.put_u8(b'\n');
    buf.freeze()
}

/// Reply for a datagram that failed to decode
///
/// Commands with a NOK status get `<reply code> NOK`; everything else
/// (including unknown codes) gets `ERR`.
pub fn malformed_reply(bytes: &[u8]) -> ControlReply {
    let code = bytes
        .split(|b| *b == b' ' || *b == b'\n')
        .next()
        .and_then(|code| std::str::from_utf8(code).ok())
        .and_then(CommandKind::from_request_code);

    match code {
        Some(kind) if kind.has_nok_status() => ControlReply::status(kind, Status::Nok),
        _ => ControlReply::Error,
    }
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a control-plane reply datagram
pub fn encode_control_reply(reply: &ControlReply) -> Bytes {
    match reply {
        ControlReply::Error => Bytes::from_static(ERR_REPLY),
        ControlReply::Status { kind, status } => {
            let mut buf = BytesMut::with_capacity(16);
            buf.put_slice(kind.reply_code().as_bytes());
            buf.put_u8(b' ');
            buf.put_slice(status.to_string().as_bytes());
            buf.put_u8(b'\n');
            buf.freeze()
        }
        ControlReply::Groups { kind, groups } => {
            let mut buf = BytesMut::with_capacity(8 + groups.len() * 34);
            buf.put_slice(kind.reply_code().as_bytes());
            buf.put_slice(format!(" {}", groups.len()).as_bytes());
            for group in groups {
                buf.put_slice(format!(" {} {} {}", group.gid, group.name, group.last_mid).as_bytes());
            }
            buf.put_u8(b'\n');
            buf.freeze()
        }
    }
}

/// Decode a control-plane reply datagram, checking it answers `expected`
pub fn decode_control_reply(bytes: &[u8], expected: CommandKind) -> Result<ControlReply> {
    if bytes == ERR_REPLY {
        return Ok(ControlReply::Error);
    }

    let tokens = tokenize(bytes)?;
    let kind = CommandKind::from_reply_code(tokens[0])
        .ok_or_else(|| BoardError::malformed(format!("unknown reply code {:?}", tokens[0])))?;
    if kind != expected {
        return Err(BoardError::malformed(format!(
            "expected {} reply, got {}",
            expected.reply_code(),
            kind.reply_code()
        )));
    }
    if tokens.len() < 2 {
        return Err(BoardError::malformed("reply without status"));
    }

    if matches!(kind, CommandKind::ListGroups | CommandKind::MyGroups)
        && tokens[1].bytes().all(|b| b.is_ascii_digit())
    {
        return decode_group_listing(kind, &tokens[1..]);
    }

    let status = Status::parse(tokens[1], tokens.get(2).copied())?;
    if tokens.len() != 1 + status.token_count() {
        return Err(BoardError::malformed("trailing tokens after status"));
    }
    Ok(ControlReply::status(kind, status))
}

fn decode_group_listing(kind: CommandKind, tokens: &[&str]) -> Result<ControlReply> {
    let count: usize = tokens[0]
        .parse()
        .map_err(|_| BoardError::malformed("invalid group count"))?;
    let fields = &tokens[1..];
    let expected = count
        .checked_mul(3)
        .ok_or_else(|| BoardError::malformed("group count out of range"))?;
    if fields.len() != expected {
        return Err(BoardError::malformed(format!(
            "group listing announces {} groups but carries {} fields",
            count,
            fields.len()
        )));
    }

    let groups = fields
        .chunks(3)
        .map(|chunk| {
            let gid: Gid = chunk[0].parse()?;
            let last_mid: Mid = chunk[2].parse()?;
            Ok(GroupSummary {
                gid,
                name: chunk[1].parse()?,
                last_mid,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ControlReply::groups(kind, groups))
}
