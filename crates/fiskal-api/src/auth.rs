// Bearer token issued by `POST auth`.
//
// Wraps the auth response like any other payload and additionally tracks the
// expiry instant, so the client can decide between reuse and renewal.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::error::Error;
use crate::payload::{FromBody, Payload};

pub(crate) const ACCESS_TOKEN: &str = "access_token";
pub(crate) const ACCESS_TOKEN_EXPIRES_AT: &str = "access_token_expires_at";
const TOKEN_EXPIRE: &str = "tokenExpire";

/// An access token plus its expiry.
///
/// Alive iff both the value and the expiry are set and the expiry is still
/// in the future. Dereferences to the wrapped [`Payload`].
#[derive(Debug, Clone, Default)]
pub struct AuthToken {
    payload: Payload,
    value: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    /// An empty, never-alive token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a token persisted from an earlier session.
    pub fn seeded(value: impl Into<String>, expires_at_epoch: i64) -> Self {
        let mut token = Self::new();
        token.set_token(Some(value.into()), Some(expires_at_epoch));
        token
    }

    /// Build from an auth response, picking up `access_token` and
    /// `access_token_expires_at`.
    pub fn from_payload(payload: Payload) -> Self {
        let value = payload.get_str(ACCESS_TOKEN).map(str::to_owned);
        let expires = payload.get_i64(ACCESS_TOKEN_EXPIRES_AT);
        let mut token = Self {
            payload,
            ..Self::default()
        };
        token.set_token(value, expires);
        token
    }

    /// Store a token value and its expiry (epoch seconds).
    ///
    /// A missing or non-positive expiry leaves the token permanently dead.
    /// When the token is usable the payload is back-filled with
    /// `access_token` / `access_token_expires_at` if it lacks them.
    pub fn set_token(&mut self, value: Option<String>, expires_at_epoch: Option<i64>) {
        self.value = value.filter(|v| !v.is_empty()).map(SecretString::from);

        let expires_at = match (&self.value, expires_at_epoch) {
            (Some(_), Some(epoch)) if epoch > 0 => DateTime::from_timestamp(epoch, 0),
            _ => None,
        };
        self.expires_at = expires_at;

        if let (Some(value), Some(at), Some(epoch)) = (&self.value, expires_at, expires_at_epoch) {
            self.payload.set(TOKEN_EXPIRE, at.to_rfc3339());
            if !self.payload.has(ACCESS_TOKEN) {
                self.payload
                    .set(ACCESS_TOKEN, value.expose_secret().to_owned());
            }
            if !self.payload.has(ACCESS_TOKEN_EXPIRES_AT) {
                self.payload.set(ACCESS_TOKEN_EXPIRES_AT, Value::from(epoch));
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive_at(Utc::now())
    }

    /// Liveness against an explicit clock reading.
    pub fn is_alive_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.value, self.expires_at) {
            (Some(_), Some(at)) => now < at,
            _ => false,
        }
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.value.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The bearer value to send, if the token is still alive.
    pub(crate) fn bearer(&self) -> Option<&str> {
        if self.is_alive() {
            self.value.as_ref().map(ExposeSecret::expose_secret)
        } else {
            None
        }
    }
}

impl Deref for AuthToken {
    type Target = Payload;

    fn deref(&self) -> &Payload {
        &self.payload
    }
}

impl FromBody for AuthToken {
    fn from_response(status: u16, body: &str) -> Result<Self, Error> {
        Payload::from_response(status, body).map(Self::from_payload)
    }

    fn summary(&self) -> Value {
        crate::log::redact(&self.payload.to_value(), &[ACCESS_TOKEN, "refresh_token"])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn epoch_in(secs: i64) -> i64 {
        (Utc::now() + Duration::seconds(secs)).timestamp()
    }

    #[test]
    fn empty_token_is_dead() {
        let token = AuthToken::new();
        assert!(!token.is_alive());
        assert!(token.bearer().is_none());
    }

    #[test]
    fn future_expiry_is_alive() {
        let token = AuthToken::seeded("t", epoch_in(600));
        assert!(token.is_alive());
        assert_eq!(token.bearer(), Some("t"));
        assert_eq!(token.get_str("access_token"), Some("t"));
        assert!(token.has("tokenExpire"));
    }

    #[test]
    fn past_expiry_is_dead() {
        let token = AuthToken::seeded("t", epoch_in(-5));
        assert!(token.expires_at().is_some());
        assert!(!token.is_alive());
        assert!(token.bearer().is_none());
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let token = AuthToken::seeded("t", 1_700_000_000);
        let at = token.expires_at().unwrap();
        assert!(token.is_alive_at(at - Duration::seconds(1)));
        assert!(!token.is_alive_at(at));
    }

    #[test]
    fn non_positive_expiry_never_alive() {
        for epoch in [0, -1] {
            let token = AuthToken::seeded("t", epoch);
            assert!(token.expires_at().is_none());
            assert!(!token.is_alive());
            assert!(!token.has("access_token"));
        }
    }

    #[test]
    fn built_from_auth_response() {
        let exp = epoch_in(300);
        let body = json!({
            "access_token": "abc",
            "access_token_expires_at": exp,
            "refresh_token": "r",
        })
        .to_string();
        let token = AuthToken::from_response(200, &body).unwrap();
        assert!(token.is_alive());
        assert_eq!(token.expires_at().unwrap().timestamp(), exp);
        assert_eq!(token.get_str("refresh_token"), Some("r"));
        assert_eq!(token.status(), Some(200));
    }

    #[test]
    fn summary_masks_tokens() {
        let token = AuthToken::seeded("secret-value", epoch_in(60));
        assert_eq!(token.summary()["access_token"], json!("***"));
    }

    #[test]
    fn response_without_token_is_dead() {
        let token = AuthToken::from_response(200, "{}").unwrap();
        assert!(!token.is_alive());
        assert!(token.token().is_none());
    }
}
