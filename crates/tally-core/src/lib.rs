//! Broadcast hub, update gateway, and daily reset for the Tally live counter.
//!
//! This crate sits between the storage layer (`tally-db`) and the network
//! surface (`tally-server`). Every counter change flows through it:
//!
//! ```text
//! client / scheduler
//!        |
//!        v
//!  UpdateGateway --apply_delta/reset--> CounterStore
//!        |
//!        +--committed StateChange--> BroadcastHub --> one slot per observer
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `tally-config.yaml` plus
//!   environment overrides.
//! - [`error`] -- [`TallyError`], the error surfaced to request handlers.
//! - [`gateway`] -- [`UpdateGateway`], the single write path.
//! - [`hub`] -- [`BroadcastHub`] observer registry and fan-out.
//! - [`schedule`] -- [`DailySchedule`] trigger arithmetic.
//! - [`scheduler`] -- [`ResetScheduler`] state machine and its spawner.
//!
//! [`TallyError`]: error::TallyError
//! [`UpdateGateway`]: gateway::UpdateGateway
//! [`BroadcastHub`]: hub::BroadcastHub
//! [`DailySchedule`]: schedule::DailySchedule
//! [`ResetScheduler`]: scheduler::ResetScheduler

pub mod config;
pub mod error;
pub mod gateway;
pub mod hub;
pub mod schedule;
pub mod scheduler;
