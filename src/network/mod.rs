//! Peer-to-peer gossip
//!
//! Newline-delimited JSON messages over TCP. Each connection gets its own
//! handler thread; the reconciliation logic lives in `server`.

pub mod message;
pub mod peers;
pub mod server;

pub use message::Message;
pub use peers::{Peer, Peers};
pub use server::{parse_endpoint, Server, SyncOutcome, ENDPOINT_SCHEME};
