//! Network Module
//!
//! Transport adapter for both planes.
//!
//! ## Architecture
//! - Control plane: one UDP socket, one iterative loop
//! - Data plane: single acceptor, one thread per connection
//! - Connection slots bounded by `Config::max_connections`
//! - Requests routed through Engine

mod control;
mod server;
mod connection;

pub use control::{handle_datagram, serve_control};
pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
