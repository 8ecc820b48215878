use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::Identity;

const EVENT_CAPACITY: usize = 256;

/// A change in who is signed in.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn {
        id_token: String,
        user: Identity,
        expires_at: DateTime<Utc>,
    },
    SignedOut {
        id_token: String,
    },
}

#[derive(Debug, Clone)]
struct SignedInUser {
    user: Identity,
    expires_at: DateTime<Utc>,
}

/// Process-wide auth state feed.
///
/// `subscribe()` is the change notification: every receiver sees every event and
/// dropping it unsubscribes. Exactly one listener (`spawn_listener`) folds the events
/// into the signed-in user map that request extraction reads. Entries are only
/// trusted until their token expires and are evicted on the next event.
///
/// Signed-out tokens are also held in a revocation list until they would have expired,
/// so a token the identity provider still accepts cannot sign the user back in.
#[derive(Clone)]
pub struct AuthHub {
    events: broadcast::Sender<AuthEvent>,
    users: Arc<RwLock<HashMap<String, SignedInUser>>>,
    revoked: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    listening: Arc<AtomicBool>,
    published: Arc<AtomicU64>,
    applied: Arc<AtomicU64>,
}

impl Default for AuthHub {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthHub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            users: Arc::new(RwLock::new(HashMap::new())),
            revoked: Arc::new(RwLock::new(HashMap::new())),
            listening: Arc::new(AtomicBool::new(false)),
            published: Arc::new(AtomicU64::new(0)),
            applied: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn publish(&self, event: AuthEvent) {
        self.published.fetch_add(1, Ordering::SeqCst);
        if self.events.send(event).is_err() {
            // No receivers: nothing will ever apply this event.
            self.applied.fetch_add(1, Ordering::SeqCst);
            warn!("Auth event published with no listener running");
        }
    }

    /// True until the listener is subscribed; user lookups before that are not authoritative.
    pub fn is_loading(&self) -> bool {
        !self.listening.load(Ordering::SeqCst)
    }

    /// The user behind an unexpired token.
    pub async fn user(&self, id_token: &str) -> Option<Identity> {
        let users = self.users.read().await;
        let entry = users.get(id_token)?;
        (entry.expires_at > Utc::now()).then(|| entry.user.clone())
    }

    pub async fn signed_in_count(&self) -> usize {
        let now = Utc::now();
        self.users
            .read()
            .await
            .values()
            .filter(|u| u.expires_at > now)
            .count()
    }

    /// Refuses `id_token` until it expires. `fallback_expiry` is used when the hub
    /// has no expiry of its own for the token.
    ///
    /// Written directly rather than through the listener so that the very next
    /// request already sees it.
    pub async fn revoke(&self, id_token: &str, fallback_expiry: DateTime<Utc>) {
        let until = self
            .users
            .read()
            .await
            .get(id_token)
            .map(|u| u.expires_at)
            .unwrap_or(fallback_expiry);

        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expiry| *expiry > now);
        if until > now {
            revoked.insert(id_token.to_string(), until);
        }
    }

    /// A fresh sign-in that yields a previously revoked token makes it valid again.
    pub async fn reinstate(&self, id_token: &str) {
        self.revoked.write().await.remove(id_token);
    }

    pub async fn is_revoked(&self, id_token: &str) -> bool {
        self.revoked
            .read()
            .await
            .get(id_token)
            .is_some_and(|until| *until > Utc::now())
    }

    /// Starts the single listener. Call once at startup.
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        // Subscribe before returning so no event published afterwards is missed.
        let mut receiver = self.subscribe();
        self.listening.store(true, Ordering::SeqCst);
        let hub = self.clone();

        tokio::spawn(async move {
            info!("Auth listener subscribed");
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        hub.apply(event).await;
                        hub.applied.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Auth listener lagged, {missed} events dropped");
                        hub.applied.fetch_add(missed, Ordering::SeqCst);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            hub.listening.store(false, Ordering::SeqCst);
            info!("Auth listener stopped");
        })
    }

    async fn apply(&self, event: AuthEvent) {
        let mut users = self.users.write().await;
        match event {
            AuthEvent::SignedIn {
                id_token,
                user,
                expires_at,
            } => {
                debug!(uid = %user.uid, %expires_at, "Auth state: signed in");
                users.insert(id_token, SignedInUser { user, expires_at });
            }
            AuthEvent::SignedOut { id_token } => {
                if let Some(entry) = users.remove(&id_token) {
                    debug!(uid = %entry.user.uid, "Auth state: signed out");
                }
            }
        }

        let now = Utc::now();
        let before = users.len();
        users.retain(|_, u| u.expires_at > now);
        if users.len() < before {
            debug!(evicted = before - users.len(), "Expired sign-ins evicted");
        }
    }

    /// Waits until the listener has applied every event published so far.
    #[cfg(test)]
    pub async fn settle(&self) {
        while self.applied.load(Ordering::SeqCst) < self.published.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn user(uid: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    fn signed_in(id_token: &str, uid: &str, expires_at: DateTime<Utc>) -> AuthEvent {
        AuthEvent::SignedIn {
            id_token: id_token.into(),
            user: user(uid),
            expires_at,
        }
    }

    fn in_an_hour() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    #[tokio::test]
    async fn test_loading_until_listener_subscribes() {
        let hub = AuthHub::new();
        assert!(hub.is_loading());
        hub.spawn_listener();
        assert!(!hub.is_loading());
    }

    #[tokio::test]
    async fn test_listener_applies_sign_in_and_out() {
        let hub = AuthHub::new();
        hub.spawn_listener();

        hub.publish(signed_in("t1", "u1", in_an_hour()));
        hub.settle().await;
        assert_eq!(hub.user("t1").await, Some(user("u1")));

        hub.publish(AuthEvent::SignedOut {
            id_token: "t1".into(),
        });
        hub.settle().await;
        assert_eq!(hub.user("t1").await, None);
        assert_eq!(hub.signed_in_count().await, 0);
    }

    #[tokio::test]
    async fn test_expired_sign_in_is_ignored_and_evicted() {
        let hub = AuthHub::new();
        hub.spawn_listener();

        hub.publish(signed_in("old", "u1", Utc::now() - Duration::seconds(1)));
        hub.settle().await;
        assert_eq!(hub.user("old").await, None);
        assert_eq!(hub.signed_in_count().await, 0);

        hub.publish(signed_in("new", "u2", in_an_hour()));
        hub.settle().await;
        assert_eq!(hub.users.read().await.len(), 1);
        assert_eq!(hub.user("new").await, Some(user("u2")));
    }

    #[tokio::test]
    async fn test_revocation_lasts_until_token_expiry() {
        let hub = AuthHub::new();
        hub.spawn_listener();
        hub.publish(signed_in("t1", "u1", in_an_hour()));
        hub.settle().await;

        hub.revoke("t1", Utc::now()).await;
        assert!(hub.is_revoked("t1").await);

        // Already expired: nothing to remember.
        hub.revoke("t2", Utc::now() - Duration::seconds(1)).await;
        assert!(!hub.is_revoked("t2").await);

        hub.reinstate("t1").await;
        assert!(!hub.is_revoked("t1").await);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_events_and_drop_unsubscribes() {
        let hub = AuthHub::new();
        let mut first = hub.subscribe();
        let second = hub.subscribe();
        drop(second);

        hub.publish(AuthEvent::SignedOut {
            id_token: "t".into(),
        });
        assert!(matches!(first.recv().await, Ok(AuthEvent::SignedOut { .. })));
        assert_eq!(hub.events.receiver_count(), 1);
    }
}
