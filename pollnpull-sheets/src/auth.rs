//! Service-account authentication (OAuth 2.0 JWT bearer grant).
//!
//! A signed RS256 assertion is exchanged at the key's `token_uri` for a
//! short-lived access token, which is cached until shortly before expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::SheetsError;

pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service-account JSON key we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(bytes: &[u8]) -> Result<Self, SheetsError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Issues and caches access tokens for one service account.
pub struct TokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    agent: ureq::Agent,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, agent: ureq::Agent) -> Result<Self, SheetsError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            key,
            encoding_key,
            agent,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// A valid bearer token, fetching a new one when the cached token is
    /// missing or about to expire. Blocking.
    pub fn access_token(&self) -> Result<String, SheetsError> {
        let now = Utc::now();
        if let Some(token) = self.cached.lock().as_ref() {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let token = self.exchange(now)?;
        let value = token.value.clone();
        *self.cached.lock() = Some(token);
        Ok(value)
    }

    /// Signed JWT assertion for the token exchange.
    pub(crate) fn assertion(&self, now: DateTime<Utc>) -> Result<String, SheetsError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: READONLY_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };
        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }

    fn exchange(&self, now: DateTime<Utc>) -> Result<AccessToken, SheetsError> {
        let assertion = self.assertion(now)?;
        let url = self.key.token_uri.as_str();
        let response = self
            .agent
            .post(url)
            .send_form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .map_err(|err| SheetsError::from_ureq(url, err))?;
        let token: TokenResponse = response.into_json().map_err(|source| SheetsError::Decode {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "obtained sheets access token",
        );
        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    const KEY_JSON: &str = include_str!("../tests/fixtures/service_account.json");
    const PUBLIC_PEM: &str = include_str!("../tests/fixtures/service_account_pub.pem");

    fn provider() -> TokenProvider {
        let key = ServiceAccountKey::from_json(KEY_JSON.as_bytes()).expect("key");
        TokenProvider::new(key, ureq::agent()).expect("provider")
    }

    #[test]
    fn key_json_defaults_token_uri() {
        let key = ServiceAccountKey::from_json(
            br#"{"client_email":"svc@x.iam","private_key":"pem"}"#,
        )
        .expect("parse");
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert!(key.private_key_id.is_none());
    }

    #[test]
    fn malformed_key_json_is_rejected() {
        let err = ServiceAccountKey::from_json(b"not json").unwrap_err();
        assert!(matches!(err, SheetsError::InvalidKey(_)), "got: {err}");
    }

    #[test]
    fn non_pem_private_key_is_rejected() {
        let key = ServiceAccountKey::from_json(
            br#"{"client_email":"svc@x.iam","private_key":"garbage"}"#,
        )
        .expect("parse");
        let err = TokenProvider::new(key, ureq::agent()).err().expect("error");
        assert!(matches!(err, SheetsError::Signing(_)), "got: {err}");
    }

    #[test]
    fn assertion_is_signed_for_the_token_endpoint() {
        let provider = provider();
        let now = Utc::now();
        let jwt = provider.assertion(now).expect("assertion");

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.googleapis.com/token"]);
        let decoded = jsonwebtoken::decode::<Claims>(
            &jwt,
            &DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).expect("public key"),
            &validation,
        )
        .expect("verify");

        assert_eq!(decoded.header.kid.as_deref(), Some("0123456789abcdef"));
        assert_eq!(decoded.claims.iss, provider.client_email());
        assert_eq!(decoded.claims.scope, READONLY_SCOPE);
        assert_eq!(decoded.claims.iat, now.timestamp());
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 3600);
    }
}
