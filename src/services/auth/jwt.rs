use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::error::ApiError;

/// Access token (JWT) claims. `sub` holds the user id as a UUID string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// The authenticated subject decoded from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
}

/// Outcome of a failed verification. Each variant maps to exactly one
/// response branch in the bearer-auth middleware.
#[derive(Debug)]
pub enum VerifyError {
    /// Signature verified but `exp` is in the past.
    Expired,
    /// Bad signature, malformed token, or a subject that is not a UUID.
    Invalid,
    /// Anything else (key problems, crypto backend failures).
    Unexpected(jsonwebtoken::errors::Error),
}

/// HS256 signer/verifier around the process-wide signing secret.
///
/// Key material is loaded once at startup and is immutable afterwards;
/// verification is pure and side-effect free.
pub struct TokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenKeys")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // A token is valid strictly until `exp`; no clock slack.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds,
        }
    }

    /// Sign a new access token for `user_id`, valid for `ttl_seconds`.
    pub fn sign(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = Utc::now().timestamp() as u64;
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| {
                error!(error = %e, "failed to sign access token");
                ApiError::Internal
            },
        )
    }

    /// Verify signature and expiry, then decode the subject.
    ///
    /// `jsonwebtoken::Validation` checks the signature and `exp`; this
    /// method additionally requires `sub` to parse as a UUID.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError> {
        let data =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
                .map_err(classify)?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| VerifyError::Invalid)?;

        Ok(VerifiedToken { user_id })
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> VerifyError {
    match err.kind() {
        ErrorKind::ExpiredSignature => VerifyError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => VerifyError::Invalid,
        _ => VerifyError::Unexpected(err),
    }
}
