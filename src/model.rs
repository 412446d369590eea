//! Domain identifiers and values
//!
//! Strongly-typed wrappers for every fixed-width field of the protocol. Each
//! type parses from its wire form (rejecting anything the validation
//! predicates reject) and displays back in the exact zero-padded form the
//! wire and the storage layout use.

use std::fmt;
use std::str::FromStr;

use crate::error::{BoardError, Result};
use crate::validation;

/// Maximum text length of a message, in bytes
pub const MAX_TEXT_LEN: usize = 240;

/// Maximum number of digits in an announced file size
pub const MAX_FILE_SIZE_DIGITS: usize = 10;

/// Maximum number of concurrently active groups
pub const MAX_GROUPS: u8 = 99;

/// Maximum message id within a group
pub const MAX_MID: u16 = 9999;

// =============================================================================
// User identifiers
// =============================================================================

/// Five-digit user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(u32);

impl Uid {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl FromStr for Uid {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        if !validation::is_valid_uid(s) {
            return Err(BoardError::malformed(format!("invalid UID {:?}", s)));
        }
        s.parse()
            .map(Uid)
            .map_err(|_| BoardError::malformed(format!("invalid UID {:?}", s)))
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

/// Eight-character alphanumeric password, compared verbatim
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Password {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        if !validation::is_valid_password(s) {
            return Err(BoardError::malformed("invalid password"));
        }
        Ok(Password(s.to_string()))
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(********)")
    }
}

// =============================================================================
// Group identifiers
// =============================================================================

/// Two-digit group id, `01` to `99`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gid(u8);

impl Gid {
    /// Build a group id from its number (1..=99)
    pub fn new(n: u8) -> Option<Gid> {
        (1..=MAX_GROUPS).contains(&n).then_some(Gid(n))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The id allocated after this one, if any
    pub fn next(self) -> Option<Gid> {
        Gid::new(self.0 + 1)
    }
}

impl FromStr for Gid {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        if !validation::is_valid_gid(s) {
            return Err(BoardError::malformed(format!("invalid GID {:?}", s)));
        }
        s.parse::<u8>()
            .ok()
            .and_then(Gid::new)
            .ok_or_else(|| BoardError::malformed(format!("invalid GID {:?}", s)))
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Group name: 1 to 24 characters of `[A-Za-z0-9_-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupName(String);

impl GroupName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for GroupName {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        if !validation::is_valid_group_name(s) {
            return Err(BoardError::malformed(format!("invalid group name {:?}", s)));
        }
        Ok(GroupName(s.to_string()))
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Four-digit message id; `0000` means "no message" / "from the start"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mid(u16);

impl Mid {
    /// The `0000` sentinel
    pub const ZERO: Mid = Mid(0);

    pub fn new(n: u16) -> Option<Mid> {
        (n <= MAX_MID).then_some(Mid(n))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// The id allocated after this one, or None once 9999 is taken
    pub fn next(self) -> Option<Mid> {
        Mid::new(self.0 + 1)
    }

    /// Parse a user-typed id (1 to 4 digits, zero padding optional)
    pub fn from_user_input(s: &str) -> Result<Mid> {
        if !validation::is_valid_mid(s) {
            return Err(BoardError::malformed(format!("invalid MID {:?}", s)));
        }
        s.parse::<u16>()
            .ok()
            .and_then(Mid::new)
            .ok_or_else(|| BoardError::malformed(format!("invalid MID {:?}", s)))
    }
}

impl FromStr for Mid {
    type Err = BoardError;

    /// Parse the wire form: exactly four digits
    fn from_str(s: &str) -> Result<Self> {
        if !validation::is_mid_token(s) {
            return Err(BoardError::malformed(format!("invalid MID {:?}", s)));
        }
        s.parse::<u16>()
            .ok()
            .and_then(Mid::new)
            .ok_or_else(|| BoardError::malformed(format!("invalid MID {:?}", s)))
    }
}

impl fmt::Display for Mid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Message text: at most 240 bytes, may contain spaces and newlines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText(Vec<u8>);

impl MessageText {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() > MAX_TEXT_LEN {
            return Err(BoardError::malformed(format!(
                "text too long: {} bytes (max {})",
                bytes.len(),
                MAX_TEXT_LEN
            )));
        }
        Ok(MessageText(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Uploaded file name: stem of up to 20 characters plus a 3-char extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FileName {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        if !validation::is_valid_file_name(s) {
            return Err(BoardError::malformed(format!("invalid file name {:?}", s)));
        }
        Ok(FileName(s.to_string()))
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
