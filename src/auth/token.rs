//! Access token issuing and verification (HS256).
//!
//! Tokens are compact JWTs carrying exactly a subject (the user id) and an
//! absolute expiry. The algorithm is pinned: a token declaring anything
//! other than HS256 is rejected before its payload is even looked at, so
//! algorithm-confusion tricks never reach the signature check.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret is empty")]
    SecretMissing,
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token is expired")]
    Expired,
    #[error("subject claim is missing")]
    SubjectMissing,
    #[error("subject claim is not a valid user id")]
    SubjectInvalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: String,
    exp: i64,
}

#[derive(Clone)]
pub struct TokenManager {
    secret: Vec<u8>,
}

impl TokenManager {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::SecretMissing);
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
        })
    }

    /// Sign a token for `user_id` that expires `ttl` from now.
    pub fn issue(&self, user_id: i64, ttl: Duration) -> Result<String, TokenError> {
        let header = serde_json::json!({ "alg": ALG, "typ": "JWT" });
        let claims = Claims {
            sub: user_id.to_string(),
            exp: Utc::now().timestamp() + ttl.as_secs() as i64,
        };

        let header = URL_SAFE_NO_PAD.encode(header.to_string());
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?,
        );

        let mut mac = self.mac();
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{header}.{payload}.{signature}"))
    }

    /// Verify a token and return its subject as a user id.
    ///
    /// Pure function of (secret, token, clock) - nothing is looked up and
    /// nothing is stored.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        let mut parts = token.split('.');
        let (header_b64, payload_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(TokenError::Malformed),
            };

        let header_raw = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed)?;
        let header: serde_json::Value =
            serde_json::from_slice(&header_raw).map_err(|_| TokenError::Malformed)?;
        if header.get("alg").and_then(|alg| alg.as_str()) != Some(ALG) {
            return Err(TokenError::SignatureInvalid);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::SignatureInvalid)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.sub.is_empty() {
            return Err(TokenError::SubjectMissing);
        }
        claims.sub.parse().map_err(|_| TokenError::SubjectInvalid)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.secret).expect("hmac key")
    }
}
