//! # shadehub-domain
//!
//! Pure domain model for the shadehub window-covering controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps, clock times
//! - Define **Devices** (blinds, shutters, curtains, awnings, skylights) and **Zones**
//! - Compute the **solar ephemeris** (sun position, sunrise/sunset, solar noon)
//! - Define **Schedules** (clock or sun-relative triggers with weekday masks)
//! - Define **Automation rules** (sensor condition → covering action)
//! - Define **Weather** input and the hazards the safety interlock reacts to
//! - Define **Events** and motion **statistics**
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod automation;
pub mod device;
pub mod event;
pub mod occupancy;
pub mod schedule;
pub mod solar;
pub mod statistics;
pub mod weather;
pub mod zone;
