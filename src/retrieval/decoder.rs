//! Retrieval page decoder
//!
//! Parses an `RRT` reply incrementally. Message text has an announced size,
//! so the only ambiguity is what follows it: a newline (end of reply), a
//! space and a digit (the next message id), or a space and `/` (an attached
//! file). One byte of lookahead settles it; when that byte turns out to be
//! the first digit of the next id it is carried over in `ElementState`.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{BoardError, Result};
use crate::model::{FileName, MessageText, Mid, Uid, MAX_FILE_SIZE_DIGITS, MAX_TEXT_LEN};
use crate::protocol::{CommandKind, FrameReader};
use crate::storage::PAGE_SIZE;
use crate::validation;

/// Where the decoder stands at the start of a message element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementState {
    /// The separating space has been consumed; the id starts next
    NeedMid,
    /// The separating space and the first id digit have been consumed
    HaveFirstDigit(u8),
}

/// Attachment of a retrieved message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub name: FileName,
    pub size: u64,
}

/// One decoded message element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedMessage {
    pub mid: Mid,
    pub author: Uid,
    pub text: MessageText,
    pub file: Option<RetrievedFile>,
}

/// Decoded retrieval reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieveReply {
    /// The user is not subscribed to the group
    NotSubscribed,
    /// No message at or after the requested id
    Eof,
    Page(Vec<RetrievedMessage>),
}

/// Receives attached file contents while a page is decoded
///
/// `data` yields exactly `size` bytes. Whatever the sink leaves unread is
/// discarded by the decoder.
pub trait FileSink {
    fn receive(&mut self, name: &FileName, size: u64, data: &mut dyn Read) -> Result<()>;
}

impl<F> FileSink for F
where
    F: FnMut(&FileName, u64, &mut dyn Read) -> Result<()>,
{
    fn receive(&mut self, name: &FileName, size: u64, data: &mut dyn Read) -> Result<()> {
        self(name, size, data)
    }
}

/// Sink that saves every attachment under a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for DirectorySink {
    fn receive(&mut self, name: &FileName, _size: u64, data: &mut dyn Read) -> Result<()> {
        let mut file = File::create(self.dir.join(name.as_str()))?;
        io::copy(data, &mut file)?;
        Ok(())
    }
}

/// Decode a complete `RRT` reply from `reader`
pub fn read_retrieve_reply<R: Read, S: FileSink>(
    reader: &mut FrameReader<R>,
    sink: &mut S,
) -> Result<RetrieveReply> {
    // Step 1: Reply code
    let code = reader.read_field(3, b' ', "reply code")?;
    if code != CommandKind::Retrieve.reply_code() {
        return Err(BoardError::malformed(format!("expected RRT reply, got {:?}", code)));
    }

    // Step 2: Status
    let (status, terminator) = reader.read_token(3, "status")?;
    match (status.as_str(), terminator) {
        ("NOK", b'\n') => return Ok(RetrieveReply::NotSubscribed),
        ("EOF", b'\n') => return Ok(RetrieveReply::Eof),
        ("OK", b' ') => {}
        _ => return Err(BoardError::malformed(format!("unexpected RRT status {:?}", status))),
    }

    // Step 3: Count (1..=20); its trailing space separates the first element
    let count = reader.read_spaced_token(2, "message count")?;
    let count: usize = match count.parse() {
        Ok(n) if validation::is_number(&count) => n,
        _ => 0,
    };
    if count == 0 || count > PAGE_SIZE {
        return Err(BoardError::malformed("message count out of range"));
    }

    // Step 4: Elements
    let mut messages = Vec::with_capacity(count);
    let mut state = ElementState::NeedMid;
    for index in 0..count {
        let last = index + 1 == count;
        let (message, next) = read_element(reader, state, last, sink)?;
        messages.push(message);
        match next {
            Some(next) => state = next,
            None => break,
        }
    }

    if messages.len() != count {
        return Err(BoardError::malformed(format!(
            "reply announced {} messages but ended after {}",
            count,
            messages.len()
        )));
    }
    Ok(RetrieveReply::Page(messages))
}

/// Decode one element; returns the state for the next one, or None once the
/// terminating newline has been read
fn read_element<R: Read, S: FileSink>(
    reader: &mut FrameReader<R>,
    state: ElementState,
    last: bool,
    sink: &mut S,
) -> Result<(RetrievedMessage, Option<ElementState>)> {
    let mid: Mid = match state {
        ElementState::NeedMid => reader.read_field(4, b' ', "MID")?.parse()?,
        ElementState::HaveFirstDigit(first) => {
            let rest = reader.read_field(3, b' ', "MID")?;
            format!("{}{}", first as char, rest).parse()?
        }
    };
    let author: Uid = reader.read_field(5, b' ', "author")?.parse()?;

    let size = reader.read_spaced_token(3, "text size")?;
    if !validation::is_number(&size) {
        return Err(BoardError::malformed(format!("invalid text size {:?}", size)));
    }
    let size: usize = size
        .parse()
        .map_err(|_| BoardError::malformed("text size out of range"))?;
    if size > MAX_TEXT_LEN {
        return Err(BoardError::malformed(format!("text size {} exceeds {}", size, MAX_TEXT_LEN)));
    }
    let text = MessageText::new(reader.read_exact_bytes(size)?)?;

    let mut message = RetrievedMessage {
        mid,
        author,
        text,
        file: None,
    };

    // One byte after the text: end of reply, or a separator
    match reader.read_byte()? {
        b'\n' if last => return Ok((message, None)),
        b' ' => {}
        other => {
            return Err(BoardError::malformed(format!(
                "unexpected byte {:?} after message {}",
                other as char, mid
            )))
        }
    }

    // One more byte of lookahead: file marker or the next id
    match reader.read_byte()? {
        b'/' => {}
        digit if digit.is_ascii_digit() && !last => {
            return Ok((message, Some(ElementState::HaveFirstDigit(digit))));
        }
        other => {
            return Err(BoardError::malformed(format!(
                "unexpected byte {:?} after message {}",
                other as char, mid
            )))
        }
    }

    reader.expect_byte(b' ', "file marker")?;
    let name: FileName = reader
        .read_spaced_token(validation::MAX_FILE_NAME_LEN, "file name")?
        .parse()?;
    let file_size = reader.read_spaced_token(MAX_FILE_SIZE_DIGITS, "file size")?;
    if !validation::is_number(&file_size) {
        return Err(BoardError::malformed(format!("invalid file size {:?}", file_size)));
    }
    let file_size: u64 = file_size
        .parse()
        .map_err(|_| BoardError::malformed("file size out of range"))?;

    receive_file(reader, sink, &name, file_size)?;
    message.file = Some(RetrievedFile {
        name,
        size: file_size,
    });

    match reader.read_byte()? {
        b'\n' if last => Ok((message, None)),
        b' ' if !last => Ok((message, Some(ElementState::NeedMid))),
        other => Err(BoardError::malformed(format!(
            "unexpected byte {:?} after file of message {}",
            other as char, mid
        ))),
    }
}

fn receive_file<R: Read, S: FileSink>(
    reader: &mut FrameReader<R>,
    sink: &mut S,
    name: &FileName,
    size: u64,
) -> Result<()> {
    let mut data = reader.get_mut().take(size);
    let delivered = sink.receive(name, size, &mut data);

    // Keep the stream aligned whatever the sink did
    io::copy(&mut data, &mut io::sink())?;
    if data.limit() != 0 {
        return Err(BoardError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("file {} ended with {} bytes missing", name, data.limit()),
        )));
    }
    delivered
}
