//! Frame reader

use std::io::{self, Write};

use msgboard::protocol::MAX_CONFIRMATION_LEN;
use msgboard::BoardError;

use super::*;

/// Writer that accepts `limit` bytes and then fails
struct FailingWriter {
    written: Vec<u8>,
    limit: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written.len() >= self.limit {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        let n = buf.len().min(self.limit - self.written.len());
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_read_token_reports_terminator() {
    let mut r = reader(b"abc def\nrest");

    assert_eq!(r.read_token(5, "a").unwrap(), ("abc".to_string(), b' '));
    assert_eq!(r.read_token(5, "b").unwrap(), ("def".to_string(), b'\n'));
    assert_eq!(remaining(&r), b"rest");
}

#[test]
fn test_read_token_bounds() {
    assert!(reader(b" x").read_token(4, "empty").is_err());
    assert!(reader(b"toolong ").read_token(4, "long").is_err());
    assert!(reader(b"four ").read_token(4, "exact").is_ok());
}

#[test]
fn test_read_field_requires_terminator() {
    assert_eq!(reader(b"01 ").read_field(2, b' ', "gid").unwrap(), "01");
    assert!(reader(b"012").read_field(2, b' ', "gid").is_err());
    assert!(reader(b"0").read_field(2, b' ', "gid").is_err());
}

#[test]
fn test_copy_exact_stops_at_length() {
    let mut r = reader(b"payload\n with newline\nNEXT");
    let mut out = Vec::new();

    r.copy_exact(22, &mut out).unwrap();

    assert_eq!(out, b"payload\n with newline\n");
    assert_eq!(remaining(&r), b"NEXT");
}

#[test]
fn test_copy_exact_drains_after_write_failure() {
    let mut r = reader(b"0123456789\n");
    let mut out = FailingWriter {
        written: Vec::new(),
        limit: 4,
    };

    let result = r.copy_exact(10, &mut out);

    assert!(matches!(result, Err(BoardError::Storage(_))));
    // The stream is positioned after the payload regardless
    assert_eq!(remaining(&r), b"\n");
}

#[test]
fn test_copy_exact_short_stream() {
    let mut r = reader(b"abc");
    let mut out = Vec::new();

    let result = r.copy_exact(10, &mut out);

    assert!(matches!(result, Err(BoardError::Io(_))));
    assert!(result.unwrap_err().is_disconnect());
}

#[test]
fn test_read_confirmation_is_bounded() {
    assert_eq!(reader(b"OK\nmore").read_confirmation(MAX_CONFIRMATION_LEN).unwrap(), b"OK\n");
    assert_eq!(reader(b"").read_confirmation(MAX_CONFIRMATION_LEN).unwrap(), b"");

    let flood = vec![b'x'; 1000];
    let confirmation = reader(&flood).read_confirmation(MAX_CONFIRMATION_LEN).unwrap();
    assert_eq!(confirmation.len(), MAX_CONFIRMATION_LEN);
}
