//! Credential store: per-identity session tokens plus one shared global token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::api::{AuthApi, SpotifyError, TokenResponse};

/// How long before expiry a token counts as stale and gets refreshed.
const REFRESH_SAFETY_WINDOW: Duration = Duration::from_secs(60);

/// An OAuth access/refresh token pair with its absolute expiry instant.
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// Opaque bearer token passed to every provider call.
    pub access_token: String,
    /// Long-lived token used to obtain new access tokens; may be absent.
    pub refresh_token: Option<String>,
    /// Instant at which `access_token` stops being accepted.
    pub expires_at: Instant,
}

impl SessionToken {
    /// Build a token from an exchange or refresh response.
    pub fn from_response(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        }
    }

    /// Pre-expired seed carrying only a refresh token, forcing a refresh on first use.
    pub fn expired_seed(refresh_token: String) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: Some(refresh_token),
            expires_at: Instant::now(),
        }
    }

    /// True when the token is expired or expires within the safety window.
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + REFRESH_SAFETY_WINDOW >= self.expires_at
    }

    /// Fold a refresh response into this token, keeping the previous refresh
    /// token when the provider does not issue a new one.
    fn absorb(&mut self, response: TokenResponse) {
        self.access_token = response.access_token;
        self.expires_at = Instant::now() + Duration::from_secs(response.expires_in);
        if let Some(refresh) = response.refresh_token {
            self.refresh_token = Some(refresh);
        }
    }
}

/// Failure modes when resolving a usable credential.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No credential is stored for the requested identity (or globally).
    #[error("no credential available")]
    Missing,
    /// The refresh attempt against the account service failed.
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] SpotifyError),
}

/// Holds the shared global credential and the per-identity session credentials.
///
/// The global slot's mutex doubles as the refresh serializer: at most one
/// in-flight global refresh exists, and concurrent callers observe either the
/// pre- or post-refresh token, never a half-updated one.
pub struct TokenStore {
    auth: Arc<dyn AuthApi>,
    global: Mutex<Option<SessionToken>>,
    sessions: DashMap<Uuid, SessionToken>,
}

impl TokenStore {
    /// Create an empty store backed by the given account-service client.
    pub fn new(auth: Arc<dyn AuthApi>) -> Self {
        Self {
            auth,
            global: Mutex::new(None),
            sessions: DashMap::new(),
        }
    }

    /// Seed the global credential from a configured long-lived refresh token.
    ///
    /// The seed is stored pre-expired and refreshed immediately; when that
    /// first refresh fails the global path stays disabled for the rest of the
    /// process lifetime.
    pub async fn seed_global(&self, refresh_token: &str) {
        {
            let mut slot = self.global.lock().await;
            *slot = Some(SessionToken::expired_seed(refresh_token.trim().to_owned()));
        }
        match self.global_access_token().await {
            Ok(_) => info!("initialized global spotify token from configured refresh token"),
            Err(err) => {
                warn!(error = %err, "failed to initialize global spotify token (global path disabled)");
            }
        }
    }

    /// Resolve the global access token, refreshing it first when stale.
    ///
    /// A failed refresh clears the slot entirely; the global credential is
    /// never silently retried.
    pub async fn global_access_token(&self) -> Result<String, TokenError> {
        let mut slot = self.global.lock().await;
        let token = slot.as_mut().ok_or(TokenError::Missing)?;

        if token.needs_refresh() {
            let Some(refresh) = token.refresh_token.clone() else {
                *slot = None;
                return Err(TokenError::Missing);
            };
            match self.auth.refresh_token(&refresh).await {
                Ok(response) => token.absorb(response),
                Err(err) => {
                    *slot = None;
                    return Err(TokenError::RefreshFailed(err));
                }
            }
        }

        Ok(token.access_token.clone())
    }

    /// Resolve the access token for a connection-scoped identity, refreshing
    /// it first when stale. A failed refresh leaves the stored token untouched.
    pub async fn session_access_token(&self, identity: Uuid) -> Result<String, TokenError> {
        let mut token = self
            .sessions
            .get(&identity)
            .map(|entry| entry.value().clone())
            .ok_or(TokenError::Missing)?;

        if token.needs_refresh() {
            let Some(refresh) = token.refresh_token.clone() else {
                return Err(TokenError::Missing);
            };
            let response = self
                .auth
                .refresh_token(&refresh)
                .await
                .map_err(TokenError::RefreshFailed)?;
            token.absorb(response);
            self.sessions.insert(identity, token.clone());
        }

        Ok(token.access_token)
    }

    /// Exchange an authorization code and store the credential under a fresh identity.
    pub async fn login(&self, code: &str) -> Result<Uuid, TokenError> {
        let response = self
            .auth
            .exchange_code(code)
            .await
            .map_err(TokenError::RefreshFailed)?;
        let identity = Uuid::new_v4();
        self.sessions
            .insert(identity, SessionToken::from_response(response));
        Ok(identity)
    }

    /// Store a credential for an identity (used by tests and manual seeding).
    pub fn insert_session(&self, identity: Uuid, token: SessionToken) {
        self.sessions.insert(identity, token);
    }

    /// Discard an identity's credential on logout.
    pub fn remove_session(&self, identity: Uuid) {
        self.sessions.remove(&identity);
    }

    /// Whether the global credential is currently present.
    pub async fn has_global(&self) -> bool {
        self.global.lock().await.is_some()
    }

    /// Whether a credential exists for the given identity.
    pub fn has_session(&self, identity: Uuid) -> bool {
        self.sessions.contains_key(&identity)
    }

    /// Whether any usable credential exists: the global one, or a session
    /// credential owned by one of the given connected identities.
    pub async fn is_connected(&self, identities: &[Uuid]) -> bool {
        if self.has_global().await {
            return true;
        }
        identities.iter().any(|id| self.sessions.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;

    use super::*;
    use crate::spotify::api::ApiResult;

    struct FakeAuth {
        refreshes: AtomicUsize,
        fail: bool,
        returned_refresh_token: Option<String>,
    }

    impl FakeAuth {
        fn ok() -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                fail: false,
                returned_refresh_token: None,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }

        fn refresh_count(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    impl AuthApi for FakeAuth {
        fn exchange_code(&self, _code: &str) -> BoxFuture<'static, ApiResult<TokenResponse>> {
            Box::pin(async {
                Ok(TokenResponse {
                    access_token: "exchanged".into(),
                    refresh_token: Some("refresh-0".into()),
                    expires_in: 3600,
                })
            })
        }

        fn refresh_token(
            &self,
            _refresh_token: &str,
        ) -> BoxFuture<'static, ApiResult<TokenResponse>> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            let refresh = self.returned_refresh_token.clone();
            Box::pin(async move {
                if fail {
                    Err(SpotifyError::Api {
                        status: 400,
                        message: "invalid_grant".into(),
                    })
                } else {
                    Ok(TokenResponse {
                        access_token: "refreshed".into(),
                        refresh_token: refresh,
                        expires_in: 3600,
                    })
                }
            })
        }
    }

    fn token_expiring_in(secs: u64) -> SessionToken {
        SessionToken {
            access_token: "stale".into(),
            refresh_token: Some("refresh-0".into()),
            expires_at: Instant::now() + Duration::from_secs(secs),
        }
    }

    #[tokio::test]
    async fn near_expiry_token_is_refreshed_exactly_once() {
        let auth = Arc::new(FakeAuth::ok());
        let store = TokenStore::new(auth.clone());
        let identity = Uuid::new_v4();
        store.insert_session(identity, token_expiring_in(30));

        let access = store.session_access_token(identity).await.unwrap();
        assert_eq!(access, "refreshed");
        assert_eq!(auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn valid_token_is_not_refreshed() {
        let auth = Arc::new(FakeAuth::ok());
        let store = TokenStore::new(auth.clone());
        let identity = Uuid::new_v4();
        store.insert_session(identity, token_expiring_in(120));

        let access = store.session_access_token(identity).await.unwrap();
        assert_eq!(access, "stale");
        assert_eq!(auth.refresh_count(), 0);
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token_when_none_returned() {
        let auth = Arc::new(FakeAuth::ok());
        let store = TokenStore::new(auth.clone());
        let identity = Uuid::new_v4();
        store.insert_session(identity, token_expiring_in(10));

        store.session_access_token(identity).await.unwrap();
        let stored = store.sessions.get(&identity).unwrap().value().clone();
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-0"));
    }

    #[tokio::test]
    async fn failed_session_refresh_leaves_stored_token_untouched() {
        let auth = Arc::new(FakeAuth::failing());
        let store = TokenStore::new(auth.clone());
        let identity = Uuid::new_v4();
        store.insert_session(identity, token_expiring_in(10));

        let err = store.session_access_token(identity).await.unwrap_err();
        assert!(matches!(err, TokenError::RefreshFailed(_)));
        let stored = store.sessions.get(&identity).unwrap().value().clone();
        assert_eq!(stored.access_token, "stale");
    }

    #[tokio::test]
    async fn failed_global_refresh_disables_the_global_path() {
        let auth = Arc::new(FakeAuth::failing());
        let store = TokenStore::new(auth.clone());
        store.seed_global("configured-refresh").await;

        assert!(!store.has_global().await);
        assert!(matches!(
            store.global_access_token().await,
            Err(TokenError::Missing)
        ));
        // The failed seed attempt is the only refresh ever made.
        assert_eq!(auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn seeded_global_token_refreshes_on_first_use() {
        let auth = Arc::new(FakeAuth::ok());
        let store = TokenStore::new(auth.clone());
        store.seed_global("configured-refresh").await;

        assert_eq!(auth.refresh_count(), 1);
        let access = store.global_access_token().await.unwrap();
        assert_eq!(access, "refreshed");
        // Still fresh: no second refresh.
        assert_eq!(auth.refresh_count(), 1);
    }
}
