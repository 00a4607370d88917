// Application state module
// Shared by every connection task

use super::types::Config;
use crate::router::{DiskFs, Dispatcher};

/// Application state
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher<DiskFs>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            dispatcher: Dispatcher::new(DiskFs, &config.routes),
        }
    }
}
