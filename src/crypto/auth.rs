//! Authentication Module
//!
//! Provides:
//! - Static bearer token validation (comma-separated `API_TOKEN` list)
//! - HS256 JWT issuance and validation with scope claims
//!
//! Each static token maps to a legacy user (`legacy_user_1`, `legacy_user_2`, ...)
//! holding every scope. JWTs are minted for those users through `POST /token`.
//! Without `JWT_SECRET_KEY` no JWT is issued or accepted.

use crate::config::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// TYPES
// ============================================================================

/// Permission carried by a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Read,
    Stake,
    Admin,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Read, Scope::Stake, Scope::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Read => "read",
            Scope::Stake => "stake",
            Scope::Admin => "admin",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data stored in a JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    pub iat: usize,
    pub exp: usize,
}

/// How a principal authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Static token from `API_TOKEN`
    Legacy,
    /// Signed access token
    Jwt,
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: String,
    pub scopes: Vec<Scope>,
    pub kind: CredentialKind,
}

impl Principal {
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn require(&self, scope: Scope) -> Result<(), AuthError> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(AuthError::MissingScope(scope))
        }
    }
}

/// Token response returned by `POST /token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid or missing token")]
    MissingToken,
    #[error("Invalid or missing token")]
    InvalidToken,
    #[error("Not enough permissions. Required: {0}")]
    MissingScope(Scope),
    #[error("Token issuance is disabled: JWT_SECRET_KEY is not configured")]
    JwtDisabled,
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

// ============================================================================
// TOKEN AUTHORITY
// ============================================================================

/// Validates bearer credentials and mints access tokens
pub struct TokenAuthority {
    /// static token -> legacy username
    legacy_users: HashMap<String, String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: Duration,
    jwt_configured: bool,
}

impl TokenAuthority {
    pub fn new(config: &AuthConfig) -> Self {
        let mut legacy_users = HashMap::new();
        for (i, token) in config.static_tokens.iter().enumerate() {
            let username = format!("legacy_user_{}", i + 1);
            debug!("Registered legacy API token for {}", username);
            legacy_users.insert(token.clone(), username);
        }
        if legacy_users.is_empty() {
            warn!("No static API tokens configured");
        }
        info!(
            "Authentication initialized: {} legacy token(s), jwt={}",
            legacy_users.len(),
            config.jwt_secret_configured
        );

        Self {
            legacy_users,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_ttl: config.access_token_ttl,
            jwt_configured: config.jwt_secret_configured,
        }
    }

    /// Whether JWTs are issued and accepted
    pub fn jwt_configured(&self) -> bool {
        self.jwt_configured
    }

    /// Resolve a bearer credential into a principal
    pub fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        if let Some(username) = self.legacy_users.get(token) {
            return Ok(Principal {
                username: username.clone(),
                scopes: Scope::ALL.to_vec(),
                kind: CredentialKind::Legacy,
            });
        }

        if !self.jwt_configured {
            debug!("Rejected non-static bearer token, JWT disabled");
            return Err(AuthError::InvalidToken);
        }

        let claims = self.validate_jwt(token)?;
        let principal = Principal {
            username: claims.sub,
            scopes: claims.scopes,
            kind: CredentialKind::Jwt,
        };
        principal.require(Scope::Read)?;
        Ok(principal)
    }

    /// Mint an access token for the legacy user behind a static token
    pub fn issue_token(&self, static_token: &str) -> Result<TokenResponse, AuthError> {
        let username = self
            .legacy_users
            .get(static_token.trim())
            .ok_or(AuthError::InvalidToken)?;
        self.issue_scoped(username, &Scope::ALL)
    }

    /// Mint an access token for `subject` with the given scopes
    pub fn issue_scoped(&self, subject: &str, scopes: &[Scope]) -> Result<TokenResponse, AuthError> {
        if !self.jwt_configured {
            return Err(AuthError::JwtDisabled);
        }

        let now = chrono::Utc::now().timestamp().max(0) as usize;
        let ttl = self.access_token_ttl.as_secs();
        let claims = Claims {
            sub: subject.to_string(),
            scopes: scopes.to_vec(),
            iat: now,
            exp: now.saturating_add(usize::try_from(ttl).unwrap_or(usize::MAX)),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        debug!("Issued access token for {} (expires in {}s)", subject, ttl);

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: ttl,
        })
    }

    fn validate_jwt(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected bearer token: {}", e);
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tokens: &[&str], secret: &str) -> AuthConfig {
        AuthConfig {
            static_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            jwt_secret: secret.to_string(),
            jwt_secret_configured: true,
            access_token_ttl: Duration::from_secs(1800),
        }
    }

    #[test]
    fn test_static_token_accepted() {
        let auth = TokenAuthority::new(&config(&["datura", "other"], "secret"));

        let first = auth.authenticate("datura").unwrap();
        assert_eq!(first.username, "legacy_user_1");
        assert_eq!(first.kind, CredentialKind::Legacy);
        assert!(first.has_scope(Scope::Stake));

        let second = auth.authenticate("other").unwrap();
        assert_eq!(second.username, "legacy_user_2");
    }

    #[test]
    fn test_invalid_and_missing_tokens_rejected() {
        let auth = TokenAuthority::new(&config(&["datura"], "secret"));
        assert!(matches!(
            auth.authenticate("invalid_token"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(auth.authenticate("  "), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_issued_token_authenticates() {
        let auth = TokenAuthority::new(&config(&["datura"], "secret"));
        let token = auth.issue_token("datura").unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 1800);

        let principal = auth.authenticate(&token.access_token).unwrap();
        assert_eq!(principal.username, "legacy_user_1");
        assert_eq!(principal.kind, CredentialKind::Jwt);
        assert!(principal.has_scope(Scope::Admin));
    }

    #[test]
    fn test_issue_requires_static_token() {
        let auth = TokenAuthority::new(&config(&["datura"], "secret"));
        assert!(matches!(
            auth.issue_token("nope"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_different_secrets_reject() {
        let minting = TokenAuthority::new(&config(&["datura"], "secret1"));
        let checking = TokenAuthority::new(&config(&["datura"], "secret2"));
        let token = minting.issue_token("datura").unwrap();
        assert!(checking.authenticate(&token.access_token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = TokenAuthority::new(&config(&["datura"], "secret"));
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "legacy_user_1".to_string(),
            scopes: vec![Scope::Read],
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(
            auth.authenticate(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_scope_checks() {
        let auth = TokenAuthority::new(&config(&["datura"], "secret"));

        let read_only = auth.issue_scoped("reader", &[Scope::Read]).unwrap();
        let principal = auth.authenticate(&read_only.access_token).unwrap();
        assert!(principal.require(Scope::Read).is_ok());
        assert!(matches!(
            principal.require(Scope::Stake),
            Err(AuthError::MissingScope(Scope::Stake))
        ));

        let no_read = auth.issue_scoped("stranger", &[Scope::Stake]).unwrap();
        assert!(matches!(
            auth.authenticate(&no_read.access_token),
            Err(AuthError::MissingScope(Scope::Read))
        ));
    }

    #[test]
    fn test_unconfigured_secret_disables_jwt() {
        let mut cfg = config(&["datura"], "");
        cfg.jwt_secret_configured = false;
        let auth = TokenAuthority::new(&cfg);

        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "attacker".to_string(),
            scopes: Scope::ALL.to_vec(),
            iat: now,
            exp: now + 3600,
        };
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b""),
        )
        .unwrap();

        assert!(matches!(
            auth.authenticate(&forged),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            auth.issue_token("datura"),
            Err(AuthError::JwtDisabled)
        ));
        assert_eq!(
            auth.authenticate("datura").unwrap().kind,
            CredentialKind::Legacy
        );
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let mut cfg = config(&["datura"], "secret");
        cfg.access_token_ttl = Duration::from_secs(u64::MAX);
        let auth = TokenAuthority::new(&cfg);

        let token = auth.issue_token("datura").unwrap();
        assert_eq!(token.expires_in, u64::MAX);
        assert!(auth.authenticate(&token.access_token).is_ok());
    }

    #[test]
    fn test_scope_serialization() {
        let json = serde_json::to_string(&Scope::ALL).unwrap();
        assert_eq!(json, r#"["read","stake","admin"]"#);
        assert_eq!(Scope::Stake.to_string(), "stake");
    }
}
