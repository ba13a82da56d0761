//! Caller Identity
//!
//! Validates JWTs from the platform's identity provider and turns them into
//! the `UserId` every match operation is invoked with. Tokens are issued
//! elsewhere; this module only checks them.

use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::ids::UserId;

/// Role claim granting dispute adjudication and refunds.
pub const ADMIN_ROLE: &str = "admin";

/// Authentication configuration.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// Expected issuer claim ("iss"). If None, any issuer accepted.
    pub issuer: Option<String>,
    /// Expected audience claim ("aud"). If None, any audience accepted.
    pub audience: Option<String>,
    /// RS256 public key in PEM format.
    pub public_key_pem: Option<String>,
    /// HS256 secret.
    pub secret: Option<String>,
}

impl AuthConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            issuer: std::env::var("AUTH_ISSUER").ok(),
            audience: std::env::var("AUTH_AUDIENCE").ok(),
            public_key_pem: std::env::var("AUTH_PUBLIC_KEY_PEM").ok(),
            secret: std::env::var("AUTH_SECRET").ok(),
        }
    }

    /// Check if authentication is configured.
    pub fn is_configured(&self) -> bool {
        self.public_key_pem.is_some() || self.secret.is_some()
    }
}

/// Claims we read from the identity provider's tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the platform user id.
    pub sub: String,
    /// Expiry timestamp (Unix seconds).
    pub exp: u64,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Granted roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl TokenClaims {
    /// The caller's `UserId`.
    ///
    /// UUID subjects map directly; any other subject is hashed into a stable
    /// id so providers with opaque subjects still work.
    pub fn user_id(&self) -> UserId {
        if let Some(id) = UserId::from_uuid_str(&self.sub) {
            return id;
        }

        let mut hasher = Sha256::new();
        hasher.update(b"wager-arena-user:");
        hasher.update(self.sub.as_bytes());
        let hash = hasher.finalize();

        let mut id = [0u8; 16];
        id.copy_from_slice(&hash[..16]);
        UserId::from_bytes(id)
    }

    /// Caller may adjudicate disputes and issue refunds.
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ADMIN_ROLE)
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authentication configured.
    #[error("authentication not configured")]
    NotConfigured,
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Issuer mismatch.
    #[error("invalid issuer")]
    InvalidIssuer,
    /// Audience mismatch.
    #[error("invalid audience")]
    InvalidAudience,
    /// Required claim is missing.
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    /// Caller lacks a required role.
    #[error("forbidden: requires role {0}")]
    Forbidden(&'static str),
    /// Other decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),
}

/// Validate a JWT and extract its claims.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let (algorithm, key) = if let Some(ref pem) = config.public_key_pem {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::DecodeError(format!("invalid public key: {}", e)))?;
        (Algorithm::RS256, key)
    } else if let Some(ref secret) = config.secret {
        (Algorithm::HS256, DecodingKey::from_secret(secret.as_bytes()))
    } else {
        return Err(AuthError::NotConfigured);
    };

    let mut validation = Validation::new(algorithm);
    validation.set_required_spec_claims(&["exp", "sub"]);
    if let Some(ref issuer) = config.issuer {
        validation.set_issuer(&[issuer]);
    }
    if let Some(ref audience) = config.audience {
        validation.set_audience(&[audience]);
    } else {
        validation.validate_aud = false;
    }

    let token_data: TokenData<TokenClaims> = decode(token, &key, &validation).map_err(map_jwt_error)?;
    let claims = token_data.claims;

    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".into()));
    }

    Ok(claims)
}

/// Validate a token and require the admin role.
pub fn require_admin(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let claims = validate_token(token, config)?;
    if !claims.is_admin() {
        return Err(AuthError::Forbidden(ADMIN_ROLE));
    }
    Ok(claims)
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::DecodeError(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "test-secret-key-256-bits-long!!";

    fn sign(claims: &TokenClaims, secret: &str) -> String {
        let key = EncodingKey::from_secret(secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key).unwrap()
    }

    fn claims(sub: &str, roles: &[&str]) -> TokenClaims {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        TokenClaims {
            sub: sub.into(),
            exp: now + 3600,
            iss: Some("arena-auth".into()),
            aud: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn config() -> AuthConfig {
        AuthConfig { secret: Some(SECRET.into()), ..Default::default() }
    }

    #[test]
    fn test_valid_token() {
        let token = sign(&claims("player-1", &[]), SECRET);
        let result = validate_token(&token, &config()).unwrap();
        assert_eq!(result.sub, "player-1");
        assert!(!result.is_admin());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut c = claims("player-1", &[]);
        c.exp = 1;
        let token = sign(&c, SECRET);
        assert!(matches!(validate_token(&token, &config()), Err(AuthError::Expired)));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let token = sign(&claims("player-1", &[]), "some-other-secret-key-here!!!");
        assert!(matches!(validate_token(&token, &config()), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_issuer_validation() {
        let token = sign(&claims("player-1", &[]), SECRET);
        let config = AuthConfig { issuer: Some("someone-else".into()), ..config() };
        assert!(matches!(validate_token(&token, &config), Err(AuthError::InvalidIssuer)));
    }

    #[test]
    fn test_not_configured() {
        assert!(!AuthConfig::default().is_configured());
        assert!(config().is_configured());
        let result = validate_token("a.b.c", &AuthConfig::default());
        assert!(matches!(result, Err(AuthError::NotConfigured)));
    }

    #[test]
    fn test_uuid_subject_maps_directly() {
        let id = UserId::new();
        assert_eq!(claims(&id.to_string(), &[]).user_id(), id);
    }

    #[test]
    fn test_opaque_subject_is_stable() {
        let a = claims("auth0|abc", &[]).user_id();
        let b = claims("auth0|abc", &[]).user_id();
        let c = claims("auth0|xyz", &[]).user_id();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_admin_required() {
        let player = sign(&claims("player-1", &[]), SECRET);
        assert!(matches!(require_admin(&player, &config()), Err(AuthError::Forbidden(_))));

        let admin = sign(&claims("ops-1", &[ADMIN_ROLE]), SECRET);
        assert!(require_admin(&admin, &config()).unwrap().is_admin());
    }
}
