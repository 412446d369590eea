//! Response definitions
//!
//! Status tokens and control-plane replies.

use std::fmt;

use crate::error::{BoardError, Result};
use crate::model::{Gid, GroupName, Mid};

use super::CommandKind;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Nok,
    Dup,
    /// A group was created with this id
    New(Gid),
    EFull,
    EUsr,
    EGrp,
    EGname,
    Eof,
}

impl Status {
    /// Parse a status token; `NEW` consumes the following gid token
    pub fn parse(token: &str, next: Option<&str>) -> Result<Status> {
        let status = match token {
            "OK" => Status::Ok,
            "NOK" => Status::Nok,
            "DUP" => Status::Dup,
            "E_FULL" => Status::EFull,
            "E_USR" => Status::EUsr,
            "E_GRP" => Status::EGrp,
            "E_GNAME" => Status::EGname,
            "EOF" => Status::Eof,
            "NEW" => {
                let gid = next.ok_or_else(|| BoardError::malformed("NEW without group id"))?;
                Status::New(gid.parse()?)
            }
            other => {
                return Err(BoardError::malformed(format!("unknown status {:?}", other)));
            }
        };
        Ok(status)
    }

    /// Number of tokens this status occupies on the wire
    pub fn token_count(self) -> usize {
        match self {
            Status::New(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("OK"),
            Status::Nok => f.write_str("NOK"),
            Status::Dup => f.write_str("DUP"),
            Status::New(gid) => write!(f, "NEW {}", gid),
            Status::EFull => f.write_str("E_FULL"),
            Status::EUsr => f.write_str("E_USR"),
            Status::EGrp => f.write_str("E_GRP"),
            Status::EGname => f.write_str("E_GNAME"),
            Status::Eof => f.write_str("EOF"),
        }
    }
}

/// One entry of a group listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub gid: Gid,
    pub name: GroupName,
    /// Highest message id, or `0000` when the group is empty
    pub last_mid: Mid,
}

/// A control-plane reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    /// `<reply code> <status>`
    Status { kind: CommandKind, status: Status },

    /// `RGL`/`RGM` listing: `<reply code> n (gid gname lastMID)*n`
    Groups {
        kind: CommandKind,
        groups: Vec<GroupSummary>,
    },

    /// `ERR` for unparseable requests
    Error,
}

impl ControlReply {
    /// Create a status reply
    pub fn status(kind: CommandKind, status: Status) -> Self {
        ControlReply::Status { kind, status }
    }

    /// Create a group listing reply
    pub fn groups(kind: CommandKind, groups: Vec<GroupSummary>) -> Self {
        ControlReply::Groups { kind, groups }
    }

    /// The status carried by this reply, if it is a status reply
    pub fn status_code(&self) -> Option<Status> {
        match self {
            ControlReply::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
