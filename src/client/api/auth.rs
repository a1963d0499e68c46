//! Authentication API trait

use async_trait::async_trait;

use crate::client::models::AccessToken;
use crate::error::Result;

/// Credential exchange for the Mobility Database API
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange a refresh credential for a short-lived access credential
    async fn exchange_token(&self, refresh_token: &str) -> Result<AccessToken>;
}
