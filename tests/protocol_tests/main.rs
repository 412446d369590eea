//! Tests for the wire codecs
//!
//! These tests verify:
//! - Control datagrams decode strictly and malformed ones get the right reply
//! - Data-plane field readers stop exactly at their terminators
//! - The frame reader keeps the stream aligned on payload errors

mod codec_tests;
mod data_tests;
mod frame_tests;

use std::io::Cursor;

use msgboard::protocol::FrameReader;
use msgboard::{Gid, Mid, Uid};

// =============================================================================
// Helper Functions
// =============================================================================

pub fn reader(bytes: &[u8]) -> FrameReader<Cursor<Vec<u8>>> {
    FrameReader::new(Cursor::new(bytes.to_vec()))
}

/// Bytes left unread in the cursor
pub fn remaining(reader: &FrameReader<Cursor<Vec<u8>>>) -> &[u8] {
    let cursor = reader.get_ref();
    &cursor.get_ref()[cursor.position() as usize..]
}

pub fn uid(s: &str) -> Uid {
    s.parse().unwrap()
}

pub fn gid(n: u8) -> Gid {
    Gid::new(n).unwrap()
}

pub fn mid(n: u16) -> Mid {
    Mid::new(n).unwrap()
}
