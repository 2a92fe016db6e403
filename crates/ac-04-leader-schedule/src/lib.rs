//! # Leader Schedule
//!
//! Deterministic slot → leader mapping per epoch. Each slot's leader
//! comes out of the annealing selector seeded by
//! `SHA-256(epoch || slot || vrf_output)`, so every node that shares
//! the consensus view derives the same table. The next epoch's table
//! is computed a full epoch ahead so transactions can be forwarded to
//! leaders long before their slots start.

pub mod config;
pub mod schedule;
pub mod service;

pub use config::ScheduleConfig;
pub use schedule::{per_slot_seed, EpochSchedule};
pub use service::{LeaderSchedule, ScheduleInfo, SlotView};
