//! # shadehub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a JSON API for manual commands (`/api/devices/{id}/position`,
//!   `/api/zones/{id}/position`, …), schedule and rule management, and
//!   read-only views of the ephemeris and statistics
//! - Accept outside inputs: weather, occupancy, measured light
//! - Map application errors into HTTP status codes
//!
//! ## Dependency rule
//! Depends on `shadehub-app` for the controller and port traits and on
//! `shadehub-domain` for request/response types. Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
