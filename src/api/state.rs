//! Application state for the API server

use crate::{Config, PodBrief};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the service instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main PodBrief service instance
    pub service: Arc<PodBrief>,

    /// Configuration (for read access)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<PodBrief>, config: Arc<Config>) -> Self {
        Self { service, config }
    }
}
