use super::CredentialVerifier;
use crate::config::DEFAULT_SESSION_TTL;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const LOGIN_FAILED_MESSAGE: &str = "Invalid username or password";

/// State of one operator session, passed explicitly to handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionContext {
    pub username: Option<String>,
    pub authenticated: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Granted { token: Uuid, context: SessionContext },
    Denied(SessionContext),
}

struct Session {
    context: SessionContext,
    created: Instant,
}

/// Token-keyed sessions. A session lives for `ttl` from login; expired
/// entries are dropped on lookup and swept on every login.
pub struct SessionStore {
    verifier: Arc<dyn CredentialVerifier>,
    sessions: RwLock<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            verifier,
            sessions: RwLock::new(HashMap::new()),
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn login(&self, username: &str, password: &str) -> LoginOutcome {
        if !self.verifier.verify(username, password) {
            warn!("Rejected login for {}", username);
            return LoginOutcome::Denied(SessionContext {
                username: None,
                authenticated: false,
                last_error: Some(LOGIN_FAILED_MESSAGE.to_string()),
            });
        }

        let token = Uuid::new_v4();
        let context = SessionContext {
            username: Some(username.to_string()),
            authenticated: true,
            last_error: None,
        };
        {
            let mut sessions = self.sessions.write().await;
            let before = sessions.len();
            sessions.retain(|_, session| session.created.elapsed() < self.ttl);
            if sessions.len() < before {
                debug!("Swept {} expired sessions", before - sessions.len());
            }
            sessions.insert(
                token,
                Session {
                    context: context.clone(),
                    created: Instant::now(),
                },
            );
        }
        info!("Login for {}", username);
        LoginOutcome::Granted { token, context }
    }

    pub async fn get(&self, token: &Uuid) -> Option<SessionContext> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if session.created.elapsed() < self.ttl => {
                    return Some(session.context.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        debug!("Session {} expired", token);
        self.sessions.write().await.remove(token);
        None
    }

    pub async fn logout(&self, token: &Uuid) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl CredentialVerifier for Fixed {
        fn verify(&self, username: &str, password: &str) -> bool {
            username == "curator" && password == "secret"
        }
    }

    #[tokio::test]
    async fn test_login_creates_session() {
        let store = SessionStore::new(Arc::new(Fixed));

        let token = match store.login("curator", "secret").await {
            LoginOutcome::Granted { token, context } => {
                assert!(context.authenticated);
                assert_eq!(context.username.as_deref(), Some("curator"));
                token
            }
            LoginOutcome::Denied(ctx) => panic!("login denied: {:?}", ctx),
        };

        let session = store.get(&token).await.expect("session exists");
        assert!(session.authenticated);
    }

    #[tokio::test]
    async fn test_failed_login_reports_error_without_session() {
        let store = SessionStore::new(Arc::new(Fixed));

        match store.login("curator", "nope").await {
            LoginOutcome::Denied(ctx) => {
                assert!(!ctx.authenticated);
                assert_eq!(ctx.last_error.as_deref(), Some(LOGIN_FAILED_MESSAGE));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(store.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_logout_removes_session() {
        let store = SessionStore::new(Arc::new(Fixed));
        let LoginOutcome::Granted { token, .. } = store.login("curator", "secret").await else {
            panic!("login denied");
        };

        assert!(store.logout(&token).await);
        assert!(store.get(&token).await.is_none());
        assert!(!store.logout(&token).await);
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_dropped() {
        let store = SessionStore::new(Arc::new(Fixed)).with_ttl(Duration::ZERO);
        let LoginOutcome::Granted { token, .. } = store.login("curator", "secret").await else {
            panic!("login denied");
        };

        assert!(store.get(&token).await.is_none());
        assert_eq!(store.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_login_sweeps_abandoned_sessions() {
        let store = SessionStore::new(Arc::new(Fixed)).with_ttl(Duration::from_millis(20));
        for _ in 0..3 {
            store.login("curator", "secret").await;
        }
        assert_eq!(store.active_sessions().await, 3);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let LoginOutcome::Granted { token, .. } = store.login("curator", "secret").await else {
            panic!("login denied");
        };

        assert_eq!(store.active_sessions().await, 1);
        assert!(store.get(&token).await.is_some());
    }
}
