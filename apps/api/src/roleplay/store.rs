use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::roleplay::{RoleplaySession, SessionError, TurnTicket};

pub const DEFAULT_IDLE_MINUTES: i64 = 120;

/// In-memory roleplay sessions. Nothing is persisted; a restart forgets every session.
///
/// Sessions idle for longer than `idle_ttl` are dropped whenever a new one is created.
/// A session with a turn in flight is never dropped.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, RoleplaySession>>>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_IDLE_MINUTES))
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_ttl,
        }
    }

    /// Creates a session, optionally starting its scenario right away.
    pub async fn create(&self, scenario: Option<&str>) -> Result<RoleplaySession, SessionError> {
        let mut session = RoleplaySession::new();
        if let Some(scenario) = scenario {
            session.start_scenario(scenario)?;
        }

        let mut sessions = self.sessions.lock().await;
        self.evict_idle(&mut sessions);
        sessions.insert(session.id, session.clone());
        debug!(session_id = %session.id, open_sessions = sessions.len(), "Roleplay session created");
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<RoleplaySession, SessionError> {
        self.sessions
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn start_scenario(
        &self,
        id: Uuid,
        scenario: &str,
    ) -> Result<RoleplaySession, SessionError> {
        self.update(id, |s| s.start_scenario(scenario)).await
    }

    pub async fn change_scenario(&self, id: Uuid) -> Result<RoleplaySession, SessionError> {
        self.update(id, |s| {
            s.change_scenario();
            Ok(())
        })
        .await
    }

    pub async fn begin_turn(&self, id: Uuid, utterance: &str) -> Result<TurnTicket, SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.begin_turn(utterance)
    }

    pub async fn complete_turn(
        &self,
        id: Uuid,
        ticket: &TurnTicket,
        reply: Option<String>,
    ) -> Result<RoleplaySession, SessionError> {
        self.update(id, |s| {
            if !s.complete_turn(ticket, reply) {
                debug!(session_id = %id, "Dropped reply for a replaced scenario");
            }
            Ok(())
        })
        .await
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, RoleplaySession>) {
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| s.is_pending() || now - s.last_active_at < self.idle_ttl);
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "Idle roleplay sessions evicted");
        }
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> Result<RoleplaySession, SessionError>
    where
        F: FnOnce(&mut RoleplaySession) -> Result<(), SessionError>,
    {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        apply(session)?;
        Ok(session.clone())
    }
}
