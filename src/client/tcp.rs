//! Data-plane requester
//!
//! One TCP connection per command, closed once the reply has been read.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{BoardError, Result};
use crate::model::{FileName, Gid, MessageText, Mid, Uid};
use crate::protocol::{
    decode_member_list, decode_post_reply, encode_list_members, encode_post_header,
    encode_retrieve, FrameReader, MemberList,
};
use crate::retrieval::{read_retrieve_reply, FileSink, RetrieveReply};

use super::udp::resolve;

/// Longest reply line accepted for `RUL`/`RPT` (99999 members of 6 bytes)
const MAX_REPLY_LINE: u64 = 16 + 6 * 100_000;

/// Confirmation sent after a retrieval page has been read
const CONFIRMATION: &[u8] = b"OK\n";

/// TCP requester for ULS, PST and RTV
pub struct DataChannel {
    server: SocketAddr,
    timeout: Duration,
}

impl DataChannel {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            server: resolve(&config.server_addr())?,
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
        })
    }

    /// `ULS gid`
    pub fn list_members(&self, gid: Gid) -> Result<MemberList> {
        let (mut reader, mut writer) = self.connect()?;
        writer.write_all(&encode_list_members(gid))?;
        writer.flush()?;
        decode_member_list(&read_line(&mut reader)?)
    }

    /// `PST uid gid tsize text [fname fsize data]`; None means `RPT NOK`
    pub fn post(
        &self,
        uid: Uid,
        gid: Gid,
        text: &MessageText,
        file: Option<&Path>,
    ) -> Result<Option<Mid>> {
        // Open the attachment before connecting so a bad path costs no traffic
        let attachment = match file {
            Some(path) => {
                let name: FileName = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| BoardError::malformed(format!("invalid file path {:?}", path)))?
                    .parse()?;
                let file = File::open(path)?;
                let size = file.metadata()?.len();
                Some((name, size, file))
            }
            None => None,
        };

        let (mut reader, mut writer) = self.connect()?;
        let header = encode_post_header(
            uid,
            gid,
            text,
            attachment.as_ref().map(|(name, size, _)| (name, *size)),
        );
        writer.write_all(&header)?;

        if let Some((name, size, file)) = attachment {
            let sent = io::copy(&mut file.take(size), &mut writer)?;
            if sent != size {
                return Err(BoardError::Transport(format!(
                    "{} shrank to {} of {} bytes while sending",
                    name, sent, size
                )));
            }
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        decode_post_reply(&read_line(&mut reader)?)
    }

    /// `RTV uid gid mid`, handing attachments to `sink`
    pub fn retrieve<S: FileSink>(
        &self,
        uid: Uid,
        gid: Gid,
        start: Mid,
        sink: &mut S,
    ) -> Result<RetrieveReply> {
        let (reader, mut writer) = self.connect()?;
        writer.write_all(&encode_retrieve(uid, gid, start))?;
        writer.flush()?;

        let mut reader = FrameReader::new(reader);
        let reply = read_retrieve_reply(&mut reader, sink)?;
        if matches!(reply, RetrieveReply::Page(_)) {
            writer.write_all(CONFIRMATION)?;
            writer.flush()?;
        }
        Ok(reply)
    }

    fn connect(&self) -> Result<(BufReader<TcpStream>, BufWriter<TcpStream>)> {
        let stream = TcpStream::connect_timeout(&self.server, self.timeout)
            .map_err(|e| BoardError::Transport(format!("cannot connect to {}: {}", self.server, e)))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok((reader, BufWriter::new(stream)))
    }
}

/// Read one newline-terminated reply line (newline included)
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    reader.take(MAX_REPLY_LINE).read_until(b'\n', &mut line)?;
    if line.last() != Some(&b'\n') {
        return Err(BoardError::malformed("reply not terminated by a newline"));
    }
    Ok(line)
}
