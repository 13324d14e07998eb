//! Server-side session storage.
//!
//! Cookies carry only an opaque session id; the state behind it lives in a
//! [`SessionStore`]. The gateway middleware is the only caller.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::access::{AccessGrant, AccessTier};

/// Cookie that carries the session id.
pub const SESSION_COOKIE: &str = "MOOPSESSID";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Accepts only ids shaped like ones we generate.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::try_parse(raw).ok().map(|id| Self(id.simple().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Login synthesised for a client inside an auto-login range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpLogin {
    pub ip: String,
    pub tier: AccessTier,
}

/// What a session remembers between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Set by an explicit credential login.
    pub username: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub access: AccessGrant,
    /// Set by IP auto-login; cleared once the address stops matching.
    pub ip_login: Option<IpLogin>,
}

impl SessionState {
    pub fn logged_in(username: impl Into<String>, role: Option<String>, access: AccessGrant) -> Self {
        Self {
            username: Some(username.into()),
            role,
            access,
            ip_login: None,
        }
    }

    /// Tier established by credential login, if any.
    pub fn explicit_tier(&self) -> Option<AccessTier> {
        self.username.as_ref()?;
        if self.role.as_deref() == Some("admin") {
            Some(AccessTier::Admin)
        } else {
            Some(AccessTier::Collaborator)
        }
    }

    pub fn with_ip_login(&self, ip_login: IpLogin) -> Self {
        Self {
            ip_login: Some(ip_login),
            ..self.clone()
        }
    }

    pub fn without_ip_login(&self) -> Self {
        Self {
            ip_login: None,
            ..self.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.ip_login.is_none()
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &SessionId) -> Option<SessionState>;
    async fn save(&self, id: &SessionId, state: SessionState);
    async fn destroy(&self, id: &SessionId);

    /// Drop sessions idle longer than the timeout. Returns how many went.
    async fn purge_expired(&self) -> usize;

    /// Sessions currently held.
    async fn count(&self) -> usize;
}

#[derive(Debug, Clone)]
struct StoredSession {
    state: SessionState,
    touched_at: DateTime<Utc>,
}

/// In-process store with idle expiry. Single node only.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
    idle_timeout: Duration,
}

impl MemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Option<SessionState> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get_mut(id)?;
        let now = Utc::now();
        if now - stored.touched_at > self.idle_timeout {
            sessions.remove(id);
            return None;
        }
        stored.touched_at = now;
        Some(stored.state.clone())
    }

    async fn save(&self, id: &SessionId, state: SessionState) {
        self.sessions.write().await.insert(
            id.clone(),
            StoredSession {
                state,
                touched_at: Utc::now(),
            },
        );
    }

    async fn destroy(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    async fn purge_expired(&self) -> usize {
        let cutoff = Utc::now() - self.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.touched_at >= cutoff);
        before - sessions.len()
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_destroy() {
        let store = MemorySessionStore::new(Duration::minutes(30));
        let id = SessionId::generate();
        let state = SessionState::logged_in("alice", None, AccessGrant::new().with("Org1", &["AsmA"]));

        store.save(&id, state.clone()).await;
        assert_eq!(store.load(&id).await, Some(state));

        assert_eq!(store.count().await, 1);

        store.destroy(&id).await;
        assert_eq!(store.load(&id).await, None);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = MemorySessionStore::new(Duration::zero() - Duration::seconds(1));
        let id = SessionId::generate();
        store.save(&id, SessionState::default()).await;
        assert_eq!(store.load(&id).await, None);
        assert_eq!(store.purge_expired().await, 0);
    }

    #[test]
    fn explicit_tier_from_role() {
        assert_eq!(SessionState::default().explicit_tier(), None);
        let admin = SessionState::logged_in("root", Some("admin".into()), AccessGrant::new());
        assert_eq!(admin.explicit_tier(), Some(AccessTier::Admin));
        let collab = SessionState::logged_in("bob", None, AccessGrant::new());
        assert_eq!(collab.explicit_tier(), Some(AccessTier::Collaborator));
    }

    #[test]
    fn session_ids_are_validated() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(id.as_str()), Some(id));
        assert_eq!(SessionId::parse("../../etc/passwd"), None);
    }
}
