//! Retrieval Module
//!
//! Streams a page of up to 20 messages, each with its text and optional
//! inline file, in a single `RRT` reply.
//!
//! ## Reply Format
//! ```text
//! RRT OK <n>
//!   ┌───────────────────────────────────────────────┐
//!   │ ␠ mid ␠ author ␠ tsize ␠ <tsize text bytes>   │  × n
//!   │ [ ␠ / ␠ fname ␠ fsize ␠ <fsize raw bytes> ]   │
//!   └───────────────────────────────────────────────┘
//! \n
//! ```
//! `RRT EOF\n` when nothing is at or after the start id, `RRT NOK\n` when the
//! user is not subscribed. After the reply the server waits for a short
//! confirmation before closing.

mod encoder;
mod decoder;

pub use crate::storage::PAGE_SIZE;
pub use encoder::{write_not_subscribed, write_page};
pub use decoder::{
    read_retrieve_reply, DirectorySink, FileSink, RetrieveReply, RetrievedFile, RetrievedMessage,
};
