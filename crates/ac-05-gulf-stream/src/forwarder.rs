//! The UDP forwarder.
//!
//! Resolves forwarding targets from the leader schedule, accumulates
//! per-target bundles, and ships them to each target's TPU port.
//! Best-effort by design: a lost datagram is covered by the three
//! future leaders that also receive the transaction.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use ac_04_leader_schedule::LeaderSchedule;
use shared_types::time::unix_micros;
use shared_types::{codec, AddressBook, PublicKey, Transaction, TpuBundle};

use crate::bundler::{BundleQueue, ReadyBundle};
use crate::config::GulfStreamConfig;

/// Forwarding counters.
#[derive(Debug, Clone, Default)]
pub struct ForwarderStats {
    pub submitted: u64,
    pub packets_sent: u64,
    pub transactions_sent: u64,
    pub failed_sends: u64,
    pub to_current_leader: u64,
    pub to_upcoming_leaders: u64,
    pub last_forward_latency_us: u64,
}

impl ForwarderStats {
    /// Bundling efficiency: transactions per datagram.
    pub fn txs_per_packet(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.transactions_sent as f64 / self.packets_sent as f64
        }
    }
}

/// Pushes transactions toward the current and next leaders.
pub struct GulfStreamForwarder {
    identity: PublicKey,
    config: GulfStreamConfig,
    schedule: Arc<LeaderSchedule>,
    address_book: Arc<AddressBook>,
    socket: UdpSocket,
    queue: Mutex<BundleQueue>,
    stats: Mutex<ForwarderStats>,
}

impl GulfStreamForwarder {
    /// Bind an ephemeral sending socket.
    pub async fn bind(
        identity: PublicKey,
        config: GulfStreamConfig,
        schedule: Arc<LeaderSchedule>,
        address_book: Arc<AddressBook>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            identity,
            config,
            schedule,
            address_book,
            socket,
            queue: Mutex::new(BundleQueue::new()),
            stats: Mutex::new(ForwarderStats::default()),
        })
    }

    /// Queue `tx` for the current leader and the next three. Bundles
    /// that hit the size cap are transmitted immediately; the rest wait
    /// for the flusher.
    pub async fn submit(&self, tx: Transaction) {
        let now = unix_micros();
        let targets = self.schedule.gulf_stream_targets(now);
        self.stats.lock().submitted += 1;

        let mut ready = Vec::new();
        {
            let mut queue = self.queue.lock();
            for target in &targets {
                // The local pool already holds our own copy.
                if *target == self.identity {
                    continue;
                }
                if let Some(bundle) =
                    queue.push(*target, tx.clone(), now, self.config.max_bundle_bytes)
                {
                    ready.push(bundle);
                }
            }
        }
        for bundle in ready {
            self.send_bundle(bundle).await;
        }
    }

    /// Transmit bundles whose timeout elapsed.
    pub async fn flush_due(&self) {
        let now = unix_micros();
        let due = self
            .queue
            .lock()
            .take_due(now, self.config.bundle_timeout_us);
        for bundle in due {
            self.send_bundle(bundle).await;
        }
    }

    /// Drop queued bundles for leaders whose slots have passed.
    pub fn cleanup_expired(&self) {
        let targets = self.schedule.gulf_stream_targets(unix_micros());
        let dropped = self.queue.lock().retain_targets(&targets);
        if dropped > 0 {
            debug!(dropped, "dropped bundles for expired leaders");
        }
    }

    async fn send_bundle(&self, bundle: ReadyBundle) {
        let now = unix_micros();
        let Some(contact) = self.address_book.lookup(&bundle.target) else {
            let mut stats = self.stats.lock();
            stats.failed_sends += 1;
            trace!(
                target = %hex::encode(&bundle.target[..4]),
                "no contact info, bundle dropped"
            );
            return;
        };

        let datagram = TpuBundle {
            bundle_id: *uuid::Uuid::new_v4().as_bytes(),
            sender: self.identity,
            timestamp: now,
            transactions: bundle.transactions,
        };
        let tx_count = datagram.transactions.len() as u64;
        let Ok(bytes) = codec::encode(&datagram) else {
            self.stats.lock().failed_sends += 1;
            return;
        };

        match self.socket.send_to(&bytes, contact.tpu_addr()).await {
            Ok(_) => {
                let is_current = self.schedule.current_leader(now) == Some(bundle.target);
                let mut stats = self.stats.lock();
                stats.packets_sent += 1;
                stats.transactions_sent += tx_count;
                if is_current {
                    stats.to_current_leader += tx_count;
                } else {
                    stats.to_upcoming_leaders += tx_count;
                }
                stats.last_forward_latency_us = unix_micros().saturating_sub(now);
            }
            Err(e) => {
                self.stats.lock().failed_sends += 1;
                warn!(
                    target = %contact.tpu_addr(),
                    error = %e,
                    "bundle send failed"
                );
            }
        }
    }

    pub fn stats(&self) -> ForwarderStats {
        self.stats.lock().clone()
    }

    /// Background flusher: drives bundle timeouts and periodic target
    /// cleanup until `shutdown` flips.
    pub fn spawn_flusher(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let period = std::time::Duration::from_micros(self.config.bundle_timeout_us / 2);
        tokio::spawn(async move {
            let mut ticks: u64 = 0;
            let mut interval = tokio::time::interval(period.max(std::time::Duration::from_millis(1)));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.flush_due().await;
                        ticks += 1;
                        // Target set shifts at slot cadence, far slower
                        // than the flush period.
                        if ticks % 64 == 0 {
                            self.cleanup_expired();
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }
}
