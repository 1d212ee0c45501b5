// Session orchestration: spawning and managing per-game hazard loops.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};

use crate::domain::{Clock, ZoneConfig, ZoneConfigError};
use crate::use_cases::scoring::{ScoringSink, scoring_sink_task};
use crate::use_cases::session::session_task;
use crate::use_cases::types::{HazardUpdate, ScoringEvent, SessionEvent, SessionState};

/// Shared configuration for spawning session loops.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity for inbound player events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast hazard updates.
    pub update_broadcast_capacity: usize,
    /// Capacity for outbound scoring events.
    pub scoring_channel_capacity: usize,
    /// Fixed tick interval for the hazard loop.
    pub tick_interval: Duration,
    /// Countdown before the session goes live and the zone timeline starts.
    pub start_countdown: Duration,
}

/// Errors returned when registering a session.
#[derive(Debug)]
pub enum SessionError {
    /// Session already exists and cannot be re-created.
    AlreadyExists,
    /// The zone configuration was rejected at load.
    InvalidZone(ZoneConfigError),
}

/// Errors returned when removing a session.
#[derive(Debug, PartialEq, Eq)]
pub enum RemoveSessionError {
    NotFound,
    /// The pinned default session is never removed.
    Pinned,
}

/// Per-session channels handed to connection adapters.
#[derive(Clone)]
pub struct SessionHandle {
    /// Identifier clients use to target this session.
    pub session_id: Arc<str>,
    /// Sender for player events into the session loop.
    pub input_tx: mpsc::Sender<SessionEvent>,
    /// Broadcast sender for raw hazard updates.
    pub update_tx: broadcast::Sender<HazardUpdate>,
    /// Broadcast sender for serialized hazard updates.
    pub update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized update for lag recovery.
    pub update_latest_tx: watch::Sender<Utf8Bytes>,
    /// Watch sender for session lifecycle changes.
    pub session_state_tx: watch::Sender<SessionState>,
    shutdown: Arc<Notify>,
    pinned: bool,
}

impl SessionHandle {
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

/// Thread-safe registry for active sessions.
pub struct SessionRegistry {
    settings: SessionSettings,
    scoring: Arc<dyn ScoringSink>,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(
        settings: SessionSettings,
        scoring: Arc<dyn ScoringSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            scoring,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Validates the zone, spawns the session loop and its scoring sink,
    /// and registers the handle.
    pub async fn create_session(
        &self,
        session_id: String,
        zone: ZoneConfig,
        pinned: bool,
    ) -> Result<SessionHandle, SessionError> {
        zone.validate().map_err(SessionError::InvalidZone)?;

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session_id) {
            return Err(SessionError::AlreadyExists);
        }

        // Channel wiring for the session loop.
        let (input_tx, input_rx) =
            mpsc::channel::<SessionEvent>(self.settings.input_channel_capacity);
        let (update_tx, _update_rx) =
            broadcast::channel::<HazardUpdate>(self.settings.update_broadcast_capacity);
        let (update_bytes_tx, _update_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.update_broadcast_capacity);
        let (update_latest_tx, _update_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (session_state_tx, _session_state_rx) =
            watch::channel::<SessionState>(SessionState::Briefing);
        let (scoring_tx, scoring_rx) =
            mpsc::channel::<ScoringEvent>(self.settings.scoring_channel_capacity);

        let shutdown = Arc::new(Notify::new());

        // Spawn the authoritative hazard loop for this session.
        tokio::spawn(session_task(
            input_rx,
            update_tx.clone(),
            scoring_tx,
            session_state_tx.clone(),
            zone,
            self.settings.tick_interval,
            self.settings.start_countdown,
            shutdown.clone(),
            self.clock.clone(),
        ));
        // And the sink draining its scoring events.
        tokio::spawn(scoring_sink_task(scoring_rx, self.scoring.clone()));

        let session = SessionHandle {
            session_id: Arc::from(session_id.clone()),
            input_tx,
            update_tx,
            update_bytes_tx,
            update_latest_tx,
            session_state_tx,
            shutdown,
            pinned,
        };

        sessions.insert(session_id, session.clone());
        Ok(session)
    }

    /// Returns a session handle for the provided id, if it exists.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// Stops a session's loop and forgets its handle.
    pub async fn remove_session(&self, session_id: &str) -> Result<(), RemoveSessionError> {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(session_id) {
            None => Err(RemoveSessionError::NotFound),
            Some(session) if session.pinned => {
                sessions.insert(session_id.to_string(), session);
                Err(RemoveSessionError::Pinned)
            }
            Some(session) => {
                session.shutdown.notify_one();
                Ok(())
            }
        }
    }
}
