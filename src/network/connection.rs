//! Connection Handler
//!
//! Runs one data-plane exchange over a TCP connection.
//!
//! ```text
//! Idle → ReadCommandCode ─┬─ ULS: ReadGID → ValidateGroup → StreamMembers
//!                         ├─ PST: ReadUID → ReadGID → ReadTextLen → ReadText
//!                         │       → [ReadFName → ReadFSize → ReceiveFile]
//!                         │       → ValidateMembership → PersistOrRollback → Reply
//!                         └─ RTV: ReadUID → ReadGID → ValidateMembership
//!                                 → ReadStartMID → StreamMessages → AwaitConfirmation
//! ```
//! Every path ends by closing the connection. Malformed fields abort the
//! exchange; domain failures are answered with a status first.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{BoardError, Result};
use crate::model::{FileName, Gid, Uid};
use crate::protocol::{
    encode_member_list, encode_post_reply, read_command_code, read_file_size, read_gid_field,
    read_start_mid, read_text, read_text_size, read_uid_field, CommandKind, FrameReader,
    ERR_REPLY, MAX_CONFIRMATION_LEN,
};
use crate::retrieval;
use crate::storage::StagedFile;
use crate::validation;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered, read field by field)
    reader: FrameReader<BufReader<TcpStream>>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: FrameReader::new(BufReader::new(read_stream)),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until the exchange is over)
    ///
    /// Transport failures and peers that go away are logged and end the
    /// exchange quietly; the caller drops the connection either way.
    pub fn handle(mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let result = self.exchange();
        let flushed = self.writer.flush().map_err(BoardError::from);

        match result.and(flushed) {
            Ok(()) => Ok(()),
            Err(e) if e.is_disconnect() => {
                tracing::debug!("Client {} disconnected: {}", self.peer_addr, e);
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!("Read timeout for client {}", self.peer_addr);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Aborting exchange with {}: {}", self.peer_addr, e);
                Err(e)
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    fn exchange(&mut self) -> Result<()> {
        let kind = match read_command_code(&mut self.reader) {
            Ok(kind) => kind,
            Err(BoardError::Malformed(reason)) => {
                tracing::debug!("Unknown command from {}: {}", self.peer_addr, reason);
                self.writer.write_all(ERR_REPLY)?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if self.engine.config().verbose {
            tracing::info!("{} from {}", kind.verb(), self.peer_addr);
        }

        match kind {
            CommandKind::ListMembers => self.list_members(),
            CommandKind::Post => self.post(),
            CommandKind::Retrieve => self.retrieve(),
            other => Err(BoardError::malformed(format!(
                "{} is not a data-plane command",
                other.request_code()
            ))),
        }
    }

    // =========================================================================
    // ULS
    // =========================================================================

    fn list_members(&mut self) -> Result<()> {
        let token = read_gid_field(&mut self.reader, b'\n')?;

        let listing = token
            .parse::<Gid>()
            .and_then(|gid| Ok((gid, self.engine.list_members(gid)?)));
        let reply = match &listing {
            Ok((gid, members)) => encode_member_list(Some((*gid, members.as_slice()))),
            Err(e) => {
                tracing::debug!("ULS {:?} from {}: {}", token, self.peer_addr, e);
                encode_member_list(None)
            }
        };

        self.writer.write_all(&reply)?;
        Ok(())
    }

    // =========================================================================
    // PST
    // =========================================================================

    fn post(&mut self) -> Result<()> {
        // Step 1: Fixed fields
        let uid = read_uid_field(&mut self.reader)?;
        let gid: Gid = read_gid_field(&mut self.reader, b' ')?.parse()?;
        let size = read_text_size(&mut self.reader)?;
        let text = read_text(&mut self.reader, size)?;

        // Step 2: Optional file, staged before anything is validated
        let upload = match self.reader.read_byte()? {
            b'\n' => None,
            b' ' => {
                let upload = self.receive_upload()?;
                self.reader.expect_byte(b'\n', "end of post")?;
                Some(upload)
            }
            other => {
                return Err(BoardError::malformed(format!(
                    "unexpected byte {:?} after post text",
                    other as char
                )))
            }
        };

        // Step 3: Validate and persist (the whole request has been consumed)
        let outcome = match upload {
            Some((_, Err(e))) => Err(e),
            Some((name, Ok(staged))) => self.engine.post(uid, gid, &text, Some((name, staged))),
            None => self.engine.post(uid, gid, &text, None),
        };

        // Step 4: Reply
        let reply = match outcome {
            Ok(mid) => {
                tracing::debug!("Post {}/{} by {} from {}", gid, mid, uid, self.peer_addr);
                encode_post_reply(Some(mid))
            }
            Err(e) => {
                log_rejection("PST", &self.peer_addr, uid, &e);
                encode_post_reply(None)
            }
        };
        self.writer.write_all(&reply)?;
        Ok(())
    }

    /// Read `fname fsize <bytes>` into a staging record
    ///
    /// Storage problems do not abort the exchange: the payload is drained
    /// and the failure is reported as a rejection once the request is read.
    fn receive_upload(&mut self) -> Result<(FileName, Result<StagedFile>)> {
        let name: FileName = self
            .reader
            .read_spaced_token(validation::MAX_FILE_NAME_LEN, "file name")?
            .parse()?;
        let size = read_file_size(&mut self.reader)?;

        let staged = match self.engine.stage_upload() {
            Ok(mut staged) => match self.reader.copy_exact(size, &mut staged) {
                Ok(()) => Ok(staged),
                Err(e @ BoardError::Storage(_)) => Err(e),
                Err(e) => return Err(e),
            },
            Err(e) => {
                self.reader.copy_exact(size, &mut io::sink())?;
                Err(e)
            }
        };

        Ok((name, staged))
    }

    // =========================================================================
    // RTV
    // =========================================================================

    fn retrieve(&mut self) -> Result<()> {
        let uid = read_uid_field(&mut self.reader)?;
        let gid: Gid = read_gid_field(&mut self.reader, b' ')?.parse()?;

        // Membership is checked before the start id is read
        if let Err(e) = self.engine.check_membership(uid, gid) {
            return self.refuse_retrieve(uid, &e);
        }

        let start = read_start_mid(&mut self.reader)?;
        let page = match self.engine.retrieve(uid, gid, start) {
            Ok(page) => page,
            Err(e) => return self.refuse_retrieve(uid, &e),
        };

        tracing::debug!(
            "RTV {} from {}: {} messages from {}",
            gid,
            self.peer_addr,
            page.len(),
            start
        );
        retrieval::write_page(&mut self.writer, &page)?;
        self.writer.flush()?;

        if !page.is_empty() {
            let confirmation = self.reader.read_confirmation(MAX_CONFIRMATION_LEN)?;
            tracing::trace!("Confirmation from {}: {:?}", self.peer_addr, confirmation);
        }
        Ok(())
    }

    fn refuse_retrieve(&mut self, uid: Uid, error: &BoardError) -> Result<()> {
        log_rejection("RTV", &self.peer_addr, uid, error);
        retrieval::write_not_subscribed(&mut self.writer)
    }
}

fn log_rejection(command: &str, peer: &str, uid: Uid, error: &BoardError) {
    if error.is_rejection() || matches!(error, BoardError::Malformed(_)) {
        tracing::debug!("{} from {} ({}) rejected: {}", command, peer, uid, error);
    } else {
        tracing::warn!("{} from {} ({}) failed: {}", command, peer, uid, error);
    }
}
