//! Node configuration: port roles and per-subsystem tunables.

use ac_03_consensus::ConsensusConfig;
use ac_04_leader_schedule::ScheduleConfig;
use ac_05_gulf_stream::GulfStreamConfig;
use ac_06_block_pipeline::PipelineConfig;
use ac_07_turbine::TurbineConfig;
use ac_02_poh::PohConfig;

/// Everything one node needs to come up. All UDP unless noted.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Bind address for the datagram listeners.
    pub ip: String,
    /// Peer-exchange port (fed by the external address-book protocol).
    pub gossip_port: u16,
    /// Transaction ingress port.
    pub tpu_port: u16,
    /// Shred ingress port.
    pub tvu_port: u16,
    pub consensus: ConsensusConfig,
    pub schedule: ScheduleConfig,
    pub gulf_stream: GulfStreamConfig,
    pub pipeline: PipelineConfig,
    pub turbine: TurbineConfig,
    pub poh: PohConfig,
    /// Parallel executor worker count.
    pub executor_workers: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            gossip_port: 9000,
            tpu_port: 9001,
            tvu_port: 9002,
            consensus: ConsensusConfig::default(),
            schedule: ScheduleConfig::default(),
            gulf_stream: GulfStreamConfig::default(),
            pipeline: PipelineConfig::default(),
            turbine: TurbineConfig::default(),
            poh: PohConfig::default(),
            executor_workers: ac_01_accounts::DEFAULT_WORKERS,
        }
    }
}
