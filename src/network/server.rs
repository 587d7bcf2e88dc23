use crate::core::{Block, Blockchain, Payload, Transaction};
use crate::error::{LedgerError, Result};
use crate::network::{Message, Peer, Peers};
use crate::storage::{MemoryPool, UnspentOutput};
use crate::wallet::Wallet;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::net::{SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const ENDPOINT_SCHEME: &str = "tcp://";
const TCP_CONNECT_TIMEOUT: u64 = 5000;

/// What a received block list did to the local chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Empty list
    Ignored,
    /// Local tip is at least as high
    UpToDate,
    /// Single block appended on the tip
    Appended,
    /// Local chain replaced by the received one
    Replaced,
    /// Single block with a gap; asked every peer for its full chain
    QueriedAll,
    Rejected(LedgerError),
}

/// Parse a `tcp://<ipv4>:<port>` endpoint
pub fn parse_endpoint(endpoint: &str) -> Result<SocketAddrV4> {
    endpoint
        .strip_prefix(ENDPOINT_SCHEME)
        .and_then(|address| address.parse::<SocketAddrV4>().ok())
        .ok_or_else(|| LedgerError::InvalidEndpoint(endpoint.to_string()))
}

/// A ledger node: chain store, pending pool, wallet and peer connections
pub struct Server {
    blockchain: Blockchain,
    peers: Peers,
    memory_pool: MemoryPool,
    wallet: Wallet,
    /// Our own endpoint, advertised in identity responses
    endpoint: String,
}

impl Server {
    pub fn new(blockchain: Blockchain, wallet: Wallet, endpoint: String) -> Server {
        Server {
            blockchain,
            peers: Peers::new(),
            memory_pool: MemoryPool::new(),
            wallet,
            endpoint,
        }
    }

    pub fn get_endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn get_blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn get_peers(&self) -> &Peers {
        &self.peers
    }

    /// Bind `addr` and serve peers until the listener fails
    pub fn run(self: &Arc<Self>, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| LedgerError::Network(format!("Failed to bind to {addr}: {e}")))?;
        info!("Server listening on {addr}");
        self.listen(listener);
        Ok(())
    }

    /// Accept inbound connections, one handler thread each
    pub fn listen(self: &Arc<Self>, listener: TcpListener) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    match stream.peer_addr() {
                        Ok(peer_addr) => info!("Inbound connection from {peer_addr}"),
                        Err(e) => warn!("Inbound connection with unknown address: {e}"),
                    }
                    if let Err(e) = self.spawn_handler(stream, None) {
                        error!("Failed to start connection handler: {e}");
                    }
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
    }

    /// Dial a peer. A no-op if a live connection to `endpoint` exists.
    pub fn connect(self: &Arc<Self>, endpoint: &str) -> Result<()> {
        let addr = parse_endpoint(endpoint)?;
        if self.peers.contains_endpoint(endpoint) {
            info!("Already connected to {endpoint}");
            return Ok(());
        }

        let stream = TcpStream::connect_timeout(
            &SocketAddr::V4(addr),
            Duration::from_millis(TCP_CONNECT_TIMEOUT),
        )
        .map_err(|e| LedgerError::Network(format!("Failed to connect to {endpoint}: {e}")))?;

        info!("Connected to peer {endpoint}");
        self.spawn_handler(stream, Some(endpoint.to_string()))
    }

    fn spawn_handler(self: &Arc<Self>, stream: TcpStream, endpoint: Option<String>) -> Result<()> {
        let writer = stream
            .try_clone()
            .map_err(|e| LedgerError::Network(format!("Failed to clone stream: {e}")))?;
        let peer = self.peers.add(writer, endpoint)?;

        let server = Arc::clone(self);
        thread::spawn(move || server.handle_connection(peer, stream));
        Ok(())
    }

    // Read newline-delimited messages until the connection closes
    fn handle_connection(&self, peer: Arc<Peer>, stream: TcpStream) {
        for message in [Message::QueryIdentity, Message::QueryLatest] {
            if let Err(e) = peer.send(&message) {
                warn!("{e}");
            }
        }

        let mut reader = BufReader::new(stream);
        let mut frame = Vec::new();
        loop {
            frame.clear();
            match reader.read_until(b'\n', &mut frame) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    info!("Connection to peer {} failed: {e}", peer.get_id());
                    break;
                }
            }
            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match Message::from_slice(&frame) {
                Ok(message) => {
                    debug!("Received from peer {}: {message:?}", peer.get_id());
                    if let Err(e) = self.handle_message(&peer, message) {
                        warn!("Error handling message from peer {}: {e}", peer.get_id());
                    }
                }
                Err(e) => warn!("Dropping message from peer {}: {e}", peer.get_id()),
            }
        }

        self.peers.remove(peer.get_id());
        info!("Peer {} disconnected", peer.get_id());
    }

    pub fn handle_message(&self, peer: &Peer, message: Message) -> Result<()> {
        match message {
            Message::QueryLatest => {
                peer.send(&Message::ResponseLatest(vec![self.blockchain.get_latest()]))
            }
            Message::QueryAll => peer.send(&Message::ResponseAll(self.blockchain.get_blocks())),
            Message::QueryIdentity => peer.send(&Message::ResponseIdentity(self.endpoint.clone())),
            Message::ResponseIdentity(endpoint) => {
                parse_endpoint(&endpoint)?;
                if peer.get_endpoint().is_none() {
                    info!("Peer {} identified as {endpoint}", peer.get_id());
                    peer.set_endpoint(endpoint);
                }
                Ok(())
            }
            Message::ResponseLatest(blocks) | Message::ResponseAll(blocks) => {
                let outcome = self.handle_received_blocks(blocks);
                debug!("Sync outcome: {outcome:?}");
                Ok(())
            }
        }
    }

    /// Reconcile a block list received from a peer with the local chain.
    ///
    /// Longest valid chain wins. A single block that links to the tip is
    /// appended; a single block past a gap triggers a full-chain query; a
    /// longer full chain replaces ours. Every change is re-announced.
    pub fn handle_received_blocks(&self, blocks: Vec<Block>) -> SyncOutcome {
        let Some(received) = blocks.last().cloned() else {
            return SyncOutcome::Ignored;
        };

        let latest = self.blockchain.get_latest();
        if received.get_index() <= latest.get_index() {
            debug!("Received chain is not longer than ours. Do nothing");
            return SyncOutcome::UpToDate;
        }

        info!(
            "Blockchain possibly behind. We got: {}, peer got: {}",
            latest.get_index(),
            received.get_index()
        );

        if blocks.len() == 1 {
            if received.get_previous_hash() != latest.get_hash() {
                info!("We have to query the chain from our peers");
                self.peers.broadcast(&Message::QueryAll);
                return SyncOutcome::QueriedAll;
            }

            return match self.blockchain.add_block(received.clone()) {
                Ok(()) => {
                    self.after_chain_change(received);
                    SyncOutcome::Appended
                }
                Err(e) => {
                    warn!("Rejected block {}: {e}", received.get_index());
                    SyncOutcome::Rejected(e)
                }
            };
        }

        match self.blockchain.replace_chain(blocks) {
            Ok(()) => {
                self.after_chain_change(received);
                SyncOutcome::Replaced
            }
            Err(e) => {
                warn!("Rejected received chain: {e}");
                SyncOutcome::Rejected(e)
            }
        }
    }

    fn after_chain_change(&self, tip: Block) {
        self.memory_pool.prune(&self.blockchain.utxo_set());
        self.peers.broadcast(&Message::ResponseLatest(vec![tip]));
    }

    /// Mine `payload` onto the local chain and announce the new block
    pub fn mine(&self, payload: Payload) -> Result<Block> {
        let block = self.blockchain.mine_block(payload)?;
        info!("New block {} is mined!", block.get_hash());
        self.after_chain_change(block.clone());
        Ok(block)
    }

    /// Mine every pending transaction into one block
    pub fn mine_pending(&self) -> Result<Block> {
        let transactions = self.memory_pool.get_all();
        info!("Mining {} pending transactions", transactions.len());
        self.mine(Payload::Transactions(transactions))
    }

    /// Build, sign and queue a transfer from the node wallet.
    ///
    /// Funded only from outputs no pending transaction already spends.
    pub fn send_transaction(&self, to: &str, amount: u64) -> Result<Transaction> {
        let utxo_set = self.blockchain.utxo_set();
        let available = utxo_set.without(&self.memory_pool.consumed_outpoints());
        let tx = Transaction::new_utxo_transaction(to, amount, &self.wallet, &available)?;
        self.memory_pool.add(tx.clone(), &utxo_set)?;
        Ok(tx)
    }

    pub fn get_chain(&self) -> Vec<Block> {
        self.blockchain.get_blocks()
    }

    pub fn get_latest(&self) -> Block {
        self.blockchain.get_latest()
    }

    pub fn list_peers(&self) -> Vec<String> {
        self.peers.endpoints()
    }

    pub fn get_balance(&self, address: &str) -> u64 {
        self.blockchain.get_balance(address)
    }

    pub fn wallet_address(&self) -> &str {
        self.wallet.get_address()
    }

    pub fn wallet_balance(&self) -> u64 {
        self.get_balance(self.wallet.get_address())
    }

    pub fn get_pool(&self) -> Vec<Transaction> {
        self.memory_pool.get_all()
    }

    pub fn get_unspent_outputs(&self) -> Vec<UnspentOutput> {
        self.blockchain.utxo_set().iter().collect()
    }
}
