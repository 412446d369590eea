//! Data-plane framing substrate
//!
//! Every TCP field is read through `FrameReader`: fixed-width fields and
//! payloads by exact byte count, short numeric and name fields by a bounded
//! scan for their single-byte terminator. Nothing is ever read past the field
//! being decoded, so payloads containing spaces or newlines cannot
//! desynchronize the stream.

use std::io::{self, Read, Write};

use crate::error::{BoardError, Result};

/// Upper bound on the retrieve confirmation read
pub const MAX_CONFIRMATION_LEN: usize = 256;

/// Chunk size for streaming file payloads
const COPY_CHUNK: usize = 8 * 1024;

/// Incremental reader over a byte stream
pub struct FrameReader<R> {
    inner: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read a single byte
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.inner.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Read a single byte and require it to be `expected`
    pub fn expect_byte(&mut self, expected: u8, what: &str) -> Result<()> {
        let byte = self.read_byte()?;
        if byte != expected {
            return Err(BoardError::malformed(format!(
                "{}: expected {:?}, got {:?}",
                what, expected as char, byte as char
            )));
        }
        Ok(())
    }

    /// Read exactly `len` bytes
    pub fn read_exact_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a fixed-width ASCII field followed by `terminator`
    pub fn read_field(&mut self, width: usize, terminator: u8, what: &str) -> Result<String> {
        let mut buf = self.read_exact_bytes(width + 1)?;
        if buf.pop() != Some(terminator) {
            return Err(BoardError::malformed(format!(
                "{}: field not followed by {:?}",
                what, terminator as char
            )));
        }
        String::from_utf8(buf).map_err(|_| BoardError::malformed(format!("{}: not ASCII", what)))
    }

    /// Read a variable-width token of at most `max_len` bytes, stopping at a
    /// space or a newline
    ///
    /// Returns the token and the terminator that ended it.
    pub fn read_token(&mut self, max_len: usize, what: &str) -> Result<(String, u8)> {
        let mut token = Vec::with_capacity(max_len);
        loop {
            let byte = self.read_byte()?;
            if byte == b' ' || byte == b'\n' {
                if token.is_empty() {
                    return Err(BoardError::malformed(format!("{}: empty field", what)));
                }
                let token = String::from_utf8(token)
                    .map_err(|_| BoardError::malformed(format!("{}: not ASCII", what)))?;
                return Ok((token, byte));
            }
            if token.len() == max_len {
                return Err(BoardError::malformed(format!(
                    "{}: longer than {} bytes",
                    what, max_len
                )));
            }
            token.push(byte);
        }
    }

    /// Like `read_token` but the terminator must be a space
    pub fn read_spaced_token(&mut self, max_len: usize, what: &str) -> Result<String> {
        let (token, terminator) = self.read_token(max_len, what)?;
        if terminator != b' ' {
            return Err(BoardError::malformed(format!("{}: not followed by a space", what)));
        }
        Ok(token)
    }

    /// Stream exactly `len` bytes into `out`
    ///
    /// Read failures abort immediately. A write failure does not: the rest of
    /// the payload is still consumed so the stream stays aligned, and the
    /// write error is reported once the payload has been drained.
    pub fn copy_exact<W: Write>(&mut self, len: u64, out: &mut W) -> Result<()> {
        let mut remaining = len;
        let mut chunk = vec![0u8; COPY_CHUNK.min(len as usize).max(1)];
        let mut write_error: Option<io::Error> = None;

        while remaining > 0 {
            let want = chunk.len().min(remaining as usize);
            let n = match self.inner.read(&mut chunk[..want]) {
                Ok(0) => {
                    return Err(BoardError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("payload ended with {} bytes missing", remaining),
                    )));
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if write_error.is_none() {
                if let Err(e) = out.write_all(&chunk[..n]) {
                    write_error = Some(e);
                }
            }
            remaining -= n as u64;
        }

        if write_error.is_none() {
            if let Err(e) = out.flush() {
                write_error = Some(e);
            }
        }

        match write_error {
            Some(e) => Err(BoardError::Storage(format!("failed to store payload: {}", e))),
            None => Ok(()),
        }
    }

    /// Bounded read used for the retrieve confirmation: stops at a newline,
    /// at `max` bytes, or when the peer closes
    pub fn read_confirmation(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while out.len() < max {
            let mut byte = [0u8; 1];
            match self.inner.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    out.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }
}
