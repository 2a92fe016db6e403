//! The TVU listener and shred relay.
//!
//! One socket per node serves both roles: the leader pushes its shred
//! set to its tree children, and every receiver forwards each new shred
//! to its own children before attempting reconstruction. Reconstructed
//! blocks flow into the reception pipeline over a bounded channel.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use shared_types::{codec, AddressBook, Block, Hash, PublicKey, Shred};

use crate::buffer::ReconstructionBuffer;
use crate::config::TurbineConfig;
use crate::errors::TurbineError;
use crate::shred::shred_block_bytes;
use crate::tree::FanoutTree;

/// Shred ingress counters.
#[derive(Debug, Clone, Default)]
pub struct TvuStats {
    pub shreds_received: u64,
    pub shreds_forwarded: u64,
    pub blocks_reconstructed: u64,
    pub invalid_datagrams: u64,
    pub bytes_received: u64,
}

/// Per-peer delivery counters. Consumed when the tree is re-formed:
/// silent peers sink toward the leaves.
pub type PeerHealth = HashMap<SocketAddr, u64>;

/// Shredded propagation endpoint of one node.
pub struct TurbineService {
    identity: PublicKey,
    config: TurbineConfig,
    socket: Arc<UdpSocket>,
    address_book: Arc<AddressBook>,
    tree: RwLock<FanoutTree>,
    buffer: Mutex<ReconstructionBuffer>,
    forwarded: Mutex<std::collections::HashSet<(Hash, u32)>>,
    block_tx: mpsc::Sender<Block>,
    stats: Mutex<TvuStats>,
    peer_health: Mutex<PeerHealth>,
    shutdown: watch::Sender<bool>,
}

impl TurbineService {
    /// Bind the shred ingress socket. Reconstructed blocks are sent on
    /// `block_tx` toward the reception pipeline.
    pub async fn bind(
        identity: PublicKey,
        ip: &str,
        tvu_port: u16,
        config: TurbineConfig,
        address_book: Arc<AddressBook>,
        tree: FanoutTree,
        block_tx: mpsc::Sender<Block>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind((ip, tvu_port)).await?;
        info!(addr = %socket.local_addr()?, "TVU listener bound");
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            identity,
            config,
            socket: Arc::new(socket),
            address_book,
            tree: RwLock::new(tree),
            buffer: Mutex::new(ReconstructionBuffer::new()),
            forwarded: Mutex::new(std::collections::HashSet::new()),
            block_tx,
            stats: Mutex::new(TvuStats::default()),
            peer_health: Mutex::new(PeerHealth::new()),
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> TvuStats {
        self.stats.lock().clone()
    }

    pub fn peer_health(&self) -> PeerHealth {
        self.peer_health.lock().clone()
    }

    /// Swap in a freshly weighted tree; called on epoch rollover.
    pub fn update_tree(&self, tree: FanoutTree) {
        *self.tree.write() = tree;
    }

    /// Leader path: shred the block's wire bytes and push the whole
    /// set to each tree child. Children relay from there.
    pub async fn broadcast_block(&self, block: &Block) -> Result<usize, TurbineError> {
        let bytes = codec::encode(block)
            .map_err(|e| TurbineError::BadBlockBytes(e.to_string()))?;
        let shreds = shred_block_bytes(block.id(), &bytes, &self.config)?;

        let children = self.tree.read().children_of(&self.identity);
        let mut sent = 0;
        for shred in &shreds {
            sent += self.send_to_peers(shred, &children).await;
        }
        info!(
            height = block.height,
            shreds = shreds.len(),
            children = children.len(),
            "block broadcast"
        );
        Ok(sent)
    }

    async fn send_to_peers(&self, shred: &Shred, peers: &[PublicKey]) -> usize {
        let Ok(bytes) = codec::encode(shred) else {
            return 0;
        };
        let mut sent = 0;
        for peer in peers {
            let Some(contact) = self.address_book.lookup(peer) else {
                continue;
            };
            match self.socket.send_to(&bytes, contact.tvu_addr()).await {
                Ok(_) => sent += 1,
                Err(e) => {
                    warn!(peer = %contact.tvu_addr(), error = %e, "shred send failed");
                }
            }
        }
        sent
    }

    /// Ingest one shred: relay it down the tree once, then try to
    /// reconstruct.
    pub async fn handle_shred(&self, shred: Shred, from: Option<SocketAddr>) {
        if let Some(from) = from {
            *self.peer_health.lock().entry(from).or_insert(0) += 1;
        }
        self.stats.lock().shreds_received += 1;

        // Relay before reconstruction so the tree keeps moving even
        // while this node is still short of shreds.
        let key = (shred.block_id, shred.index);
        let fresh = self.forwarded.lock().insert(key);
        if fresh {
            let children = self.tree.read().children_of(&self.identity);
            if !children.is_empty() {
                let sent = self.send_to_peers(&shred, &children).await;
                self.stats.lock().shreds_forwarded += sent as u64;
            }
        }

        let reconstructed = self.buffer.lock().insert(shred, &self.config);
        if let Some(bytes) = reconstructed {
            match codec::decode::<Block>(&bytes) {
                Ok(block) => {
                    self.stats.lock().blocks_reconstructed += 1;
                    if self.block_tx.send(block).await.is_err() {
                        warn!("reception pipeline closed; block dropped");
                    }
                }
                Err(error) => {
                    self.stats.lock().invalid_datagrams += 1;
                    warn!(%error, "reconstructed bytes are not a block");
                }
            }
        }

        // Bound the relay-dedup set.
        let mut forwarded = self.forwarded.lock();
        if forwarded.len() > 1 << 16 {
            forwarded.clear();
        }
    }

    /// Start the receive loop.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut buf = vec![0u8; service.config.recv_buffer_bytes];
            loop {
                tokio::select! {
                    result = service.socket.recv_from(&mut buf) => {
                        match result {
                            Ok((len, from)) => {
                                service.stats.lock().bytes_received += len as u64;
                                match codec::decode::<Shred>(&buf[..len]) {
                                    Ok(shred) => service.handle_shred(shred, Some(from)).await,
                                    Err(_) => {
                                        service.stats.lock().invalid_datagrams += 1;
                                        debug!(%from, "undecodable shred datagram");
                                    }
                                }
                            }
                            Err(e) => warn!(error = %e, "TVU receive failed"),
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("TVU listener stopped");
        })
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}
