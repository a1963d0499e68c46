//! Refresh and access credential lifecycle

use tokio::sync::RwLock;

use super::api::AuthApi;
use super::models::AccessToken;
use crate::config::ENV_REFRESH_TOKEN;
use crate::error::{AuthError, Result};

/// Holds the refresh credential and the access credential derived from it.
///
/// The access credential lives in memory only. Setting a new refresh
/// credential drops it, so the next request re-derives one.
pub struct TokenManager {
    state: RwLock<AuthState>,
    env_var: String,
}

/// Internal authentication state
#[derive(Debug, Default)]
struct AuthState {
    refresh_token: Option<String>,
    access: Option<AccessToken>,
}

impl TokenManager {
    /// Create a manager; without an explicit refresh credential it falls back
    /// to MOBDB_REFRESH_TOKEN at exchange time.
    pub fn new(refresh_token: Option<String>) -> Self {
        Self {
            state: RwLock::new(AuthState {
                refresh_token: refresh_token.filter(|t| !t.trim().is_empty()),
                access: None,
            }),
            env_var: ENV_REFRESH_TOKEN.to_string(),
        }
    }

    /// Read the fallback refresh credential from a different variable
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Replace the refresh credential and drop any cached access credential.
    ///
    /// A blank credential clears the explicit one.
    pub async fn set_refresh_token(&self, refresh_token: impl Into<String>) {
        let refresh_token = refresh_token.into();
        let mut state = self.state.write().await;
        state.refresh_token = Some(refresh_token).filter(|t| !t.trim().is_empty());
        state.access = None;
    }

    /// Install an access credential directly
    pub async fn set_access_token(&self, token: AccessToken) {
        self.state.write().await.access = Some(token);
    }

    pub async fn clear_access_token(&self) {
        self.state.write().await.access = None;
    }

    pub async fn has_access_token(&self) -> bool {
        self.state.read().await.access.is_some()
    }

    /// Resolve the refresh credential: explicit first, then the environment
    /// as it is right now.
    pub async fn refresh_token(&self) -> Result<String> {
        if let Some(token) = self.state.read().await.refresh_token.clone() {
            return Ok(token);
        }

        std::env::var(&self.env_var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AuthError::MissingRefreshToken.into())
    }

    /// Current access credential, exchanging the refresh credential when
    /// there is none, it is about to expire, or `force` is set.
    pub async fn access_token<A>(&self, api: &A, force: bool) -> Result<String>
    where
        A: AuthApi + ?Sized,
    {
        if !force {
            let state = self.state.read().await;
            if let Some(access) = state.access.as_ref().filter(|a| !a.is_expired()) {
                return Ok(access.token.clone());
            }
        }

        let refresh_token = self.refresh_token().await?;
        log::debug!("Exchanging refresh credential for access credential");
        let access = api.exchange_token(&refresh_token).await?;
        let token = access.token.clone();

        self.set_access_token(access).await;
        Ok(token)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print credentials
        f.debug_struct("TokenManager")
            .field("env_var", &self.env_var)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const UNSET_VAR: &str = "MOBDB_TEST_REFRESH_TOKEN_UNSET";

    /// Issues `access-N` for every exchange and remembers the last refresh token
    #[derive(Default)]
    struct CountingAuth {
        calls: AtomicUsize,
        last_refresh: std::sync::Mutex<Option<String>>,
        expires_in: Option<Duration>,
        empty: bool,
    }

    #[async_trait]
    impl AuthApi for CountingAuth {
        async fn exchange_token(&self, refresh_token: &str) -> Result<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            *self.last_refresh.lock().unwrap() = Some(refresh_token.to_string());
            if self.empty {
                return Err(AuthError::ExchangeFailed.into());
            }
            Ok(AccessToken {
                token: format!("access-{}", n),
                expires_at: self.expires_in.map(|d| Utc::now() + d),
            })
        }
    }

    fn manager(refresh: Option<&str>) -> TokenManager {
        TokenManager::new(refresh.map(String::from)).with_env_var(UNSET_VAR)
    }

    #[tokio::test]
    async fn test_missing_refresh_token() {
        let auth = CountingAuth::default();
        let err = manager(None).access_token(&auth, false).await.unwrap_err();

        assert!(matches!(err, Error::Auth(AuthError::MissingRefreshToken)));
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_refresh_token_is_missing() {
        let auth = CountingAuth::default();
        let err = manager(Some("  ")).access_token(&auth, false).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::MissingRefreshToken)));
    }

    #[tokio::test]
    async fn test_set_blank_refresh_token_is_missing() {
        let auth = CountingAuth::default();
        let tokens = manager(Some("refresh-1"));
        tokens.access_token(&auth, false).await.unwrap();

        tokens.set_refresh_token(" \t").await;
        assert!(!tokens.has_access_token().await);

        let err = tokens.access_token(&auth, false).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::MissingRefreshToken)));
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_access_token_reused() {
        let auth = CountingAuth::default();
        let tokens = manager(Some("refresh-1"));

        assert_eq!(tokens.access_token(&auth, false).await.unwrap(), "access-1");
        assert_eq!(tokens.access_token(&auth, false).await.unwrap(), "access-1");
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.last_refresh.lock().unwrap().as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_force_refresh() {
        let auth = CountingAuth::default();
        let tokens = manager(Some("refresh-1"));

        tokens.access_token(&auth, false).await.unwrap();
        assert_eq!(tokens.access_token(&auth, true).await.unwrap(), "access-2");
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_new_refresh_token_invalidates_access() {
        let auth = CountingAuth::default();
        let tokens = manager(Some("refresh-1"));

        tokens.access_token(&auth, false).await.unwrap();
        tokens.set_refresh_token("refresh-2").await;
        assert!(!tokens.has_access_token().await);

        // Exactly one exchange after the change
        assert_eq!(tokens.access_token(&auth, false).await.unwrap(), "access-2");
        assert_eq!(tokens.access_token(&auth, false).await.unwrap(), "access-2");
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
        assert_eq!(auth.last_refresh.lock().unwrap().as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_expiring_access_token_rederived() {
        let auth = CountingAuth {
            expires_in: Some(Duration::minutes(2)),
            ..CountingAuth::default()
        };
        let tokens = manager(Some("refresh-1"));

        // Inside the 5 minute buffer, so every call exchanges
        tokens.access_token(&auth, false).await.unwrap();
        tokens.access_token(&auth, false).await.unwrap();
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exchange_failure_surfaces() {
        let auth = CountingAuth {
            empty: true,
            ..CountingAuth::default()
        };
        let tokens = manager(Some("refresh-1"));

        let err = tokens.access_token(&auth, false).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::ExchangeFailed)));
        assert!(!tokens.has_access_token().await);
    }

    #[tokio::test]
    async fn test_preset_access_token() {
        let auth = CountingAuth::default();
        let tokens = manager(None);
        tokens.set_access_token(AccessToken::new("preset")).await;

        // No refresh credential needed while the access credential is valid
        assert_eq!(tokens.access_token(&auth, false).await.unwrap(), "preset");
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_debug_hides_credentials() {
        let tokens = manager(Some("secret-refresh"));
        assert!(!format!("{:?}", tokens).contains("secret-refresh"));
    }
}
