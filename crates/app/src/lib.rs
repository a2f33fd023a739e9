//! # shadehub-app
//!
//! Application layer: the five evaluation components and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `EventPublisher`: fan events out to subscribers
//!   - `EnergyStrategy`: pick an energy-saving position for a covering
//!   - `MotionTimer`: report back when a simulated movement has finished
//! - Implement the components, leaf-first:
//!   - `Actuator`: single writer of device position and tilt, debounced
//!   - `TriggerScheduler`: clock and sun-relative schedules
//!   - `RuleEngine`: sensor rules with cooldown and season gating
//!   - `SafetyInterlock`: weather hazards, always the last writer
//! - Own all shared state in `HomeState` and expose it through the `Controller`
//! - Provide **in-process infrastructure** (event bus, tokio motion timer, cycle tasks)
//!
//! ## Dependency rule
//! Depends on `shadehub-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actuator;
pub mod controller;
pub mod energy;
pub mod event_bus;
pub mod favorites;
pub mod motion_timer;
pub mod ports;
pub mod rule_engine;
pub mod runtime;
pub mod safety;
pub mod scheduler;
pub mod state;
