//! # msgboard
//!
//! A centralized message board service with:
//! - A UDP control plane for accounts and group membership
//! - A TCP data plane for member listings, posts and retrieval
//! - A filesystem-backed entity store
//! - Paged retrieval with inline file attachments
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐    ┌──────────────────────────┐
//! │   UDP control loop       │    │   TCP acceptor           │
//! │  (one request at a time) │    │  (thread per connection) │
//! └────────────┬─────────────┘    └────────────┬─────────────┘
//!              │                               │
//! ┌────────────▼───────────────────────────────▼─────────────┐
//! │                        Engine                            │
//! │        (status mapping, membership, posting)             │
//! └────────────┬───────────────────────────────┬─────────────┘
//!              │                               │
//!              ▼                               ▼
//!   ┌─────────────────────┐         ┌─────────────────────┐
//!   │    EntityStore      │◀────────│     Retrieval       │
//!   │ (directory records) │         │  (page encoder)     │
//!   └─────────────────────┘         └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod validation;
pub mod model;

pub mod protocol;
pub mod storage;
pub mod retrieval;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BoardError, Result};
pub use config::{ClientConfig, Config};
pub use engine::Engine;
pub use model::{FileName, Gid, GroupName, MessageText, Mid, Password, Uid};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of msgboard
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
