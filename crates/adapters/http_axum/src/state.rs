//! Shared application state for axum handlers.

use std::sync::Arc;

use shadehub_app::controller::Controller;
use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};

/// Application state shared across all axum handlers.
///
/// Generic over the controller's ports to avoid dynamic dispatch.
/// `Clone` is implemented manually so the port types themselves do not
/// need to be `Clone`; only the `Arc` is cloned.
pub struct AppState<P, E, T> {
    pub controller: Arc<Controller<P, E, T>>,
}

impl<P, E, T> Clone for AppState<P, E, T> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<P, E, T> AppState<P, E, T>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    /// Wrap a controller that is also shared with the background cycles.
    pub fn new(controller: Arc<Controller<P, E, T>>) -> Self {
        Self { controller }
    }
}
