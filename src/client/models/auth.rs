//! Authentication models

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Short-lived access credential derived from a refresh credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token string
    pub token: String,

    /// Expiration time, when the exchange reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// A token with no known expiry
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    /// Check if the token is expired or will expire soon (within 5 minutes).
    ///
    /// Tokens without a known expiry never expire on their own.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => expires_at - Duration::minutes(5) < Utc::now(),
        }
    }
}

/// Body of the credential exchange response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub expiration_datetime_utc: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Convert into an [`AccessToken`]; `None` if no token was returned.
    ///
    /// Expiry comes from `expiration_datetime_utc`, or else from the `exp`
    /// claim when the token is a JWT.
    pub fn into_access_token(self) -> Option<AccessToken> {
        let token = self.access_token.filter(|t| !t.trim().is_empty())?;
        let expires_at = self
            .expiration_datetime_utc
            .as_deref()
            .and_then(parse_expiry)
            .or_else(|| jwt_expiry(&token));

        Some(AccessToken { token, expires_at })
    }
}

fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // The API omits the offset on UTC timestamps
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Read the `exp` claim of a JWT without verifying it.
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct Claims {
        exp: i64,
    }

    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"user","exp":{}}}"#, exp));
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_token_expiry() {
        let mut token = AccessToken::new("t");
        assert!(!token.is_expired());

        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());

        token.expires_at = Some(Utc::now() + Duration::hours(1));
        assert!(!token.is_expired());

        // Expiring within the 5 minute buffer counts as expired
        token.expires_at = Some(Utc::now() + Duration::minutes(2));
        assert!(token.is_expired());
    }

    #[test]
    fn test_response_without_token() {
        let response: TokenResponse = serde_json::from_str(r#"{"token_type": "Bearer"}"#).unwrap();
        assert!(response.into_access_token().is_none());

        let response: TokenResponse = serde_json::from_str(r#"{"access_token": ""}"#).unwrap();
        assert!(response.into_access_token().is_none());
    }

    #[test]
    fn test_explicit_expiration_field() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token": "abc", "expiration_datetime_utc": "2030-01-01T12:00:00", "token_type": "Bearer"}"#,
        )
        .unwrap();

        let token = response.into_access_token().unwrap();
        assert_eq!(token.token, "abc");
        assert_eq!(
            token.expires_at.map(|t| t.to_rfc3339()),
            Some("2030-01-01T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_expiry_from_jwt_claim() {
        let exp = Utc::now().timestamp() + 3600;
        let response = TokenResponse {
            access_token: Some(jwt_with_exp(exp)),
            expiration_datetime_utc: None,
            token_type: None,
        };

        let token = response.into_access_token().unwrap();
        assert_eq!(token.expires_at.map(|t| t.timestamp()), Some(exp));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_opaque_token_has_no_expiry() {
        assert!(jwt_expiry("opaque-token").is_none());
        assert!(jwt_expiry("a.!!!.c").is_none());
    }
}
