//! Capability tokens for the track server.
//!
//! A token scopes access to exactly one (organism, assembly) bundle for a
//! fixed window. It carries no user identity. Tokens are RS256 JWTs: this
//! side signs with the private key, the track server verifies with the public
//! key alone. There is no revocation list; a leaked token stays valid until
//! `exp`.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token payload. `iat`/`exp` are the issued-at and expires-at instants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackClaims {
    pub organism: String,
    pub assembly: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// What a verified token grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackScope {
    pub organism: String,
    pub assembly: String,
}

impl TrackScope {
    pub fn covers(&self, organism: &str, assembly: &str) -> bool {
        self.organism == organism && self.assembly == assembly
    }
}

impl From<TrackClaims> for TrackScope {
    fn from(claims: TrackClaims) -> Self {
        Self {
            organism: claims.organism,
            assembly: claims.assembly,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("track token {0} unavailable: no key configured")]
    Unavailable(&'static str),

    #[error("failed to read key {path}: {message}")]
    KeyLoad { path: String, message: String },

    #[error("token generation failed: {0}")]
    Signing(String),

    #[error("token expired")]
    Expired,

    #[error("token signature invalid")]
    InvalidSignature,

    #[error("token malformed: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Issues and verifies track tokens. Keys are loaded once and kept for the
/// life of the process.
pub struct TrackTokenService {
    encoding_key: Option<EncodingKey>,
    decoding_key: Option<DecodingKey>,
    ttl: Duration,
}

impl TrackTokenService {
    pub const DEFAULT_TTL_SECS: i64 = 3600;

    /// Build from PEM contents. Either half may be absent: the web app needs
    /// only the private key, the track server only the public key.
    pub fn from_pem(
        private_pem: Option<&[u8]>,
        public_pem: Option<&[u8]>,
        ttl: Duration,
    ) -> Result<Self, TokenError> {
        let encoding_key = private_pem
            .map(EncodingKey::from_rsa_pem)
            .transpose()
            .map_err(|e| TokenError::KeyLoad {
                path: "private key".to_string(),
                message: e.to_string(),
            })?;
        let decoding_key = public_pem
            .map(DecodingKey::from_rsa_pem)
            .transpose()
            .map_err(|e| TokenError::KeyLoad {
                path: "public key".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            encoding_key,
            decoding_key,
            ttl,
        })
    }

    /// Load keys from disk. A missing or unreadable key disables that half
    /// and logs a warning; it never fails startup.
    pub fn from_key_files(private_path: Option<&Path>, public_path: Option<&Path>, ttl: Duration) -> Self {
        let private_pem = private_path.and_then(|p| read_key(p, "private"));
        let public_pem = public_path.and_then(|p| read_key(p, "public"));

        let encoding_key = private_pem.and_then(|pem| {
            EncodingKey::from_rsa_pem(&pem)
                .map_err(|e| tracing::warn!("Track token private key is not a valid RSA PEM: {}", e))
                .ok()
        });
        let decoding_key = public_pem.and_then(|pem| {
            DecodingKey::from_rsa_pem(&pem)
                .map_err(|e| tracing::warn!("Track token public key is not a valid RSA PEM: {}", e))
                .ok()
        });

        Self {
            encoding_key,
            decoding_key,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn can_issue(&self) -> bool {
        self.encoding_key.is_some()
    }

    pub fn can_verify(&self) -> bool {
        self.decoding_key.is_some()
    }

    pub fn issue_token(&self, organism: &str, assembly: &str) -> Result<String, TokenError> {
        self.issue_token_at(organism, assembly, Utc::now())
    }

    pub fn issue_token_at(
        &self,
        organism: &str,
        assembly: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let key = self.encoding_key.as_ref().ok_or(TokenError::Unavailable("issuance"))?;

        let claims = TrackClaims {
            organism: organism.to_string(),
            assembly: assembly.to_string(),
            issued_at: now.timestamp(),
            expires_at: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, key).map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Signature must match and `exp` must not have passed.
    pub fn verify_token(&self, token: &str) -> Result<TrackScope, TokenError> {
        self.decode_claims(token, true).map(TrackScope::from)
    }

    /// Signature must match; expiry is not checked. Only for trusted peers
    /// in relaxed-expiry mode.
    pub fn verify_ignoring_expiry(&self, token: &str) -> Result<TrackScope, TokenError> {
        self.decode_claims(token, false).map(TrackScope::from)
    }

    fn decode_claims(&self, token: &str, validate_exp: bool) -> Result<TrackClaims, TokenError> {
        let key = self.decoding_key.as_ref().ok_or(TokenError::Unavailable("verification"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Ok(decode::<TrackClaims>(token, key, &validation)?.claims)
    }
}

fn read_key(path: &Path, which: &str) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("Track token {} key {} not loaded: {}", which, path.display(), e);
            None
        }
    }
}
