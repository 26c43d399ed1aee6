//! HTTP API for the shopping assistant

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::profile::ProfileStore;
use crate::session::ChatSession;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: ChatSession,
    pub profiles: ProfileStore,
}

impl AppState {
    pub fn new(session: ChatSession, profiles: ProfileStore) -> Self {
        Self { session, profiles }
    }
}
