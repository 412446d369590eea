//! Retrieval page encoder
//!
//! Writes an `RRT` reply for a page of stored messages, streaming attached
//! files straight from storage.

use std::fs::File;
use std::io::{self, Read, Write};

use bytes::{BufMut, BytesMut};

use crate::error::{BoardError, Result};
use crate::protocol::CommandKind;
use crate::storage::{MessageMeta, PAGE_SIZE};

/// Write the reply for a membership failure: `RRT NOK\n`
pub fn write_not_subscribed<W: Write>(out: &mut W) -> Result<()> {
    out.write_all(format!("{} NOK\n", CommandKind::Retrieve.reply_code()).as_bytes())?;
    Ok(())
}

/// Write a complete retrieval reply for `page`
///
/// An empty page is encoded as `RRT EOF\n`. Otherwise the count goes first,
/// then one element per message:
/// ```text
///  <mid> <author> <tsize> <text>[ / <fname> <fsize> <bytes>]
/// ```
/// and a single newline after the last element.
pub fn write_page<W: Write>(out: &mut W, page: &[MessageMeta]) -> Result<()> {
    let code = CommandKind::Retrieve.reply_code();
    if page.is_empty() {
        out.write_all(format!("{} EOF\n", code).as_bytes())?;
        return Ok(());
    }
    if page.len() > PAGE_SIZE {
        return Err(BoardError::Storage(format!(
            "page of {} messages exceeds {}",
            page.len(),
            PAGE_SIZE
        )));
    }

    out.write_all(format!("{} OK {}", code, page.len()).as_bytes())?;

    for message in page {
        let mut element = BytesMut::with_capacity(16 + message.text.len());
        element.put_slice(
            format!(" {} {} {} ", message.mid, message.author, message.text.len()).as_bytes(),
        );
        element.put_slice(message.text.as_bytes());
        out.write_all(&element)?;

        if let Some(file) = &message.file {
            out.write_all(format!(" / {} {} ", file.name, file.size).as_bytes())?;

            // The announced size is authoritative; a short file would
            // desynchronize the peer, so that is an error, not a truncation
            let mut content = File::open(&file.path)?.take(file.size);
            let copied = io::copy(&mut content, out)?;
            if copied != file.size {
                return Err(BoardError::Storage(format!(
                    "file {} shrank to {} of {} bytes while streaming",
                    file.name, copied, file.size
                )));
            }
        }
    }

    out.write_all(b"\n")?;
    Ok(())
}
