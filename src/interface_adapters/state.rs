use std::sync::Arc;

use crate::use_cases::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    // Registry owning the active session loops.
    pub session_registry: Arc<SessionRegistry>,
    // Session new connections land in when none is specified.
    pub default_session_id: Arc<str>,
}
