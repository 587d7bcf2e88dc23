use crate::error::{LedgerError, Result};
use crate::network::Message;
use log::{debug, warn};
use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

const TCP_WRITE_TIMEOUT: u64 = 5000;

/// One live connection. The endpoint is learned from the peer's identity
/// response and stays unknown until then.
pub struct Peer {
    id: u64,
    endpoint: RwLock<Option<String>>,
    writer: Mutex<TcpStream>,
}

impl Peer {
    pub fn get_id(&self) -> u64 {
        self.id
    }

    pub fn get_endpoint(&self) -> Option<String> {
        self.endpoint
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_endpoint(&self, endpoint: String) {
        *self.endpoint.write().unwrap_or_else(PoisonError::into_inner) = Some(endpoint);
    }

    /// Write one newline-terminated message
    pub fn send(&self, message: &Message) -> Result<()> {
        let mut line = message.encode()?;
        line.push('\n');
        debug!("Sending to peer {}: {line}", self.id);

        let mut stream = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| {
                // A partial line would corrupt the next frame; end the connection
                // so the reader thread unregisters the peer.
                let _ = stream.shutdown(Shutdown::Both);
                LedgerError::Network(format!("Failed to send to peer {}: {e}", self.id))
            })
    }
}

/// Registry of live connections
pub struct Peers {
    inner: RwLock<Vec<Arc<Peer>>>,
    next_id: AtomicU64,
}

impl Default for Peers {
    fn default() -> Self {
        Self::new()
    }
}

impl Peers {
    pub fn new() -> Peers {
        Peers {
            inner: RwLock::new(vec![]),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register the write half of a connection
    pub fn add(&self, stream: TcpStream, endpoint: Option<String>) -> Result<Arc<Peer>> {
        stream
            .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))
            .map_err(|e| LedgerError::Network(format!("Failed to set write timeout: {e}")))?;

        let peer = Arc::new(Peer {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            endpoint: RwLock::new(endpoint),
            writer: Mutex::new(stream),
        });
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&peer));
        Ok(peer)
    }

    pub fn remove(&self, id: u64) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|peer| peer.id != id);
    }

    pub fn snapshot(&self) -> Vec<Arc<Peer>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Known endpoints of live connections, without duplicates
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = vec![];
        for endpoint in self.snapshot().iter().filter_map(|peer| peer.get_endpoint()) {
            if !endpoints.contains(&endpoint) {
                endpoints.push(endpoint);
            }
        }
        endpoints
    }

    pub fn contains_endpoint(&self, endpoint: &str) -> bool {
        self.snapshot()
            .iter()
            .any(|peer| peer.get_endpoint().as_deref() == Some(endpoint))
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send to every live peer. A failing peer is logged and skipped.
    pub fn broadcast(&self, message: &Message) {
        for peer in self.snapshot() {
            if let Err(e) = peer.send(message) {
                warn!("{e}");
            }
        }
    }
}
