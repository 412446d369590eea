//! Field validation predicates
//!
//! Pure `&str -> bool` checks for every identifier and name that crosses the
//! wire. The codec and the user application lean on these; nothing here
//! touches storage or sockets.

/// Maximum group name length
pub const MAX_GROUP_NAME_LEN: usize = 24;

/// Maximum uploaded file name length (20 + '.' + 3)
pub const MAX_FILE_NAME_LEN: usize = 24;

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Non-empty string of ASCII digits
pub fn is_number(s: &str) -> bool {
    !s.is_empty() && all_digits(s)
}

/// User id: exactly five digits
pub fn is_valid_uid(s: &str) -> bool {
    s.len() == 5 && all_digits(s)
}

/// Password: exactly eight ASCII alphanumerics
pub fn is_valid_password(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Existing group id: `01` to `99`
pub fn is_valid_gid(s: &str) -> bool {
    s.len() == 2 && all_digits(s) && s != "00"
}

/// Any two-digit group token, including `00` (group creation)
pub fn is_gid_token(s: &str) -> bool {
    s.len() == 2 && all_digits(s)
}

/// Group name: 1 to 24 of `[A-Za-z0-9_-]`
pub fn is_valid_group_name(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_GROUP_NAME_LEN && s.bytes().all(is_name_byte)
}

/// Message id as typed by a user: 1 to 4 digits
pub fn is_valid_mid(s: &str) -> bool {
    !s.is_empty() && s.len() <= 4 && all_digits(s)
}

/// Message id on the wire: exactly four digits
pub fn is_mid_token(s: &str) -> bool {
    s.len() == 4 && all_digits(s)
}

/// Upload file name: 1 to 20 of `[A-Za-z0-9_-]`, a dot, a 3-char extension
pub fn is_valid_file_name(s: &str) -> bool {
    let Some((stem, ext)) = s.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty()
        && stem.len() <= 20
        && stem.bytes().all(is_name_byte)
        && ext.len() == 3
        && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Port: decimal 0 to 65535, at most five digits
pub fn is_valid_port(s: &str) -> bool {
    is_number(s) && s.len() <= 5 && s.parse::<u32>().map(|p| p <= 65535).unwrap_or(false)
}

/// Hostname (dot-separated labels) or dotted-quad IPv4 address
pub fn is_valid_address(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = s.split('.').collect();
    if labels.len() == 4 && labels.iter().all(|l| is_number(l)) {
        return labels
            .iter()
            .all(|l| l.len() <= 3 && l.parse::<u16>().map(|v| v <= 255).unwrap_or(false));
    }
    labels.iter().all(|label| {
        let bytes = label.as_bytes();
        !bytes.is_empty()
            && bytes.len() <= 63
            && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
            && bytes[0] != b'-'
            && bytes[bytes.len() - 1] != b'-'
    })
}
