//! The TPU listener.
//!
//! Binds the transaction ingress port and feeds validated transactions
//! into the local pool. Runs on every node, not only leaders, so a
//! leader-elect already holds its pool when the slot starts.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use shared_types::time::unix_micros;
use shared_types::{codec, TpuBundle};

use crate::config::GulfStreamConfig;
use crate::mempool::Mempool;
use crate::tx_verify::verify_transaction;

/// Ingress counters.
#[derive(Debug, Clone, Default)]
pub struct TpuStats {
    pub transactions_received: u64,
    pub duplicates_dropped: u64,
    pub invalid_packets: u64,
    pub invalid_transactions: u64,
    pub bytes_received: u64,
    pub started_us: u64,
}

impl TpuStats {
    pub fn uptime_secs(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.started_us) / 1_000_000
    }
}

/// UDP listener on the TPU port.
pub struct TpuListener {
    socket: Arc<UdpSocket>,
    mempool: Arc<Mempool>,
    config: GulfStreamConfig,
    stats: Arc<Mutex<TpuStats>>,
    shutdown: watch::Sender<bool>,
}

impl TpuListener {
    /// Bind `ip:tpu_port`. Port 0 picks an ephemeral port, which tests
    /// use.
    pub async fn bind(
        ip: &str,
        tpu_port: u16,
        config: GulfStreamConfig,
        mempool: Arc<Mempool>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind((ip, tpu_port)).await?;
        info!(addr = %socket.local_addr()?, "TPU listener bound");
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            socket: Arc::new(socket),
            mempool,
            config,
            stats: Arc::new(Mutex::new(TpuStats {
                started_us: unix_micros(),
                ..TpuStats::default()
            })),
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> TpuStats {
        self.stats.lock().clone()
    }

    /// Start the receive loop on a task. Per-datagram decode and
    /// signature checks are offloaded to the runtime's worker pool so
    /// the socket loop never stalls behind verification.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let mempool = Arc::clone(&self.mempool);
        let stats = Arc::clone(&self.stats);
        let mut shutdown = self.shutdown.subscribe();
        let buffer_size = self.config.recv_buffer_bytes;

        tokio::spawn(async move {
            let mut buf = vec![0u8; buffer_size];
            loop {
                tokio::select! {
                    result = socket.recv_from(&mut buf) => {
                        match result {
                            Ok((len, from)) => {
                                stats.lock().bytes_received += len as u64;
                                let datagram = buf[..len].to_vec();
                                let mempool = Arc::clone(&mempool);
                                let stats = Arc::clone(&stats);
                                tokio::spawn(async move {
                                    handle_datagram(&datagram, &mempool, &stats, from);
                                });
                            }
                            Err(e) => {
                                warn!(error = %e, "TPU receive failed");
                            }
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("TPU listener stopped");
        })
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

fn handle_datagram(
    bytes: &[u8],
    mempool: &Mempool,
    stats: &Mutex<TpuStats>,
    from: std::net::SocketAddr,
) {
    let bundle: TpuBundle = match codec::decode(bytes) {
        Ok(bundle) => bundle,
        Err(_) => {
            stats.lock().invalid_packets += 1;
            debug!(%from, "undecodable TPU datagram");
            return;
        }
    };

    for tx in bundle.transactions {
        if verify_transaction(&tx).is_err() {
            stats.lock().invalid_transactions += 1;
            continue;
        }
        match mempool.insert(tx) {
            Ok(()) => stats.lock().transactions_received += 1,
            Err(_) => stats.lock().duplicates_dropped += 1,
        }
    }
}
