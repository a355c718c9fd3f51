use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Serialize;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::TokenType;

/// Validity windows of the two tokens in a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl TokenLifetimes {
    pub fn new(access: Duration, refresh: Duration) -> Self {
        Self { access, refresh }
    }
}

/// Freshly minted access/refresh pair.
///
/// `expired_at` and `refreshable_until` are the `exp` claims of the access
/// and refresh tokens respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub expired_at: DateTime<Utc>,
    pub refreshable_until: DateTime<Utc>,
}

/// Mints and verifies signed token pairs under one issuer.
pub struct TokenIssuer {
    jwt_handler: JwtHandler,
    issuer: String,
}

impl TokenIssuer {
    /// Create a new token issuer.
    ///
    /// # Arguments
    /// * `secret` - Shared HS256 signing secret
    /// * `issuer` - Constant `iss` claim stamped on and required from every token
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        Self {
            jwt_handler: JwtHandler::new(secret, &issuer),
            issuer,
        }
    }

    /// Mint an access and a refresh token for a subject.
    ///
    /// # Arguments
    /// * `subject` - Subject identifier (`sub` claim)
    /// * `role` - Role tag (`role` claim)
    /// * `lifetimes` - Access and refresh validity windows
    /// * `now` - Issuance instant
    ///
    /// # Returns
    /// TokenPair whose expiry timestamps match the embedded `exp` claims
    ///
    /// # Errors
    /// * `EncodingFailed` - Signing failed or an expiry is out of range
    pub fn issue(
        &self,
        subject: impl ToString,
        role: &str,
        lifetimes: &TokenLifetimes,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, JwtError> {
        let subject = subject.to_string();

        let access_claims = Claims::new(
            &subject,
            role,
            TokenType::Access,
            &self.issuer,
            now,
            lifetimes.access,
        );
        let refresh_claims = Claims::new(
            &subject,
            role,
            TokenType::Refresh,
            &self.issuer,
            now,
            lifetimes.refresh,
        );

        let expired_at = Self::expiry_of(&access_claims)?;
        let refreshable_until = Self::expiry_of(&refresh_claims)?;

        Ok(TokenPair {
            access: self.jwt_handler.encode(&access_claims)?,
            refresh: self.jwt_handler.encode(&refresh_claims)?,
            expired_at,
            refreshable_until,
        })
    }

    /// Verify a token's signature, issuer and expiry, and check its type.
    ///
    /// # Errors
    /// * `TokenExpired`, `InvalidSignature`, `InvalidIssuer`, `DecodingFailed` - see `JwtHandler::decode`
    /// * `WrongTokenType` - Token is valid but of the other type
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims: Claims = self.jwt_handler.decode(token)?;

        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType {
                expected: expected.as_str(),
                actual: claims.token_type.as_str(),
            });
        }

        Ok(claims)
    }

    fn expiry_of(claims: &Claims) -> Result<DateTime<Utc>, JwtError> {
        claims
            .expires_at()
            .ok_or_else(|| JwtError::EncodingFailed(format!("exp {} out of range", claims.exp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    fn lifetimes() -> TokenLifetimes {
        TokenLifetimes::new(Duration::minutes(30), Duration::days(7))
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let issuer = TokenIssuer::new(SECRET, "identity-service");

        let pair = issuer
            .issue("user123", "member", &lifetimes(), Utc::now())
            .expect("Failed to issue tokens");

        assert!(!pair.access.is_empty());
        assert!(!pair.refresh.is_empty());
        assert_ne!(pair.access, pair.refresh);

        let access = issuer
            .verify(&pair.access, TokenType::Access)
            .expect("Access token rejected");
        assert_eq!(access.sub, "user123");
        assert_eq!(access.role, "member");
        assert_eq!(access.iss, "identity-service");

        let refresh = issuer
            .verify(&pair.refresh, TokenType::Refresh)
            .expect("Refresh token rejected");
        assert_eq!(refresh.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_expiry_timestamps_match_claims() {
        let issuer = TokenIssuer::new(SECRET, "identity-service");
        let now = Utc::now();

        let pair = issuer
            .issue("user123", "admin", &lifetimes(), now)
            .expect("Failed to issue tokens");

        let access = issuer.verify(&pair.access, TokenType::Access).unwrap();
        let refresh = issuer.verify(&pair.refresh, TokenType::Refresh).unwrap();

        assert_eq!(pair.expired_at.timestamp(), access.exp);
        assert_eq!(pair.refreshable_until.timestamp(), refresh.exp);
        assert_eq!(access.exp - now.timestamp(), 30 * 60);
        assert_eq!(refresh.exp - now.timestamp(), 7 * 24 * 60 * 60);
        assert!(pair.expired_at > now);
    }

    #[test]
    fn test_two_issues_differ() {
        let issuer = TokenIssuer::new(SECRET, "identity-service");
        let now = Utc::now();

        let first = issuer.issue("user123", "member", &lifetimes(), now).unwrap();
        let second = issuer.issue("user123", "member", &lifetimes(), now).unwrap();

        assert_ne!(first.access, second.access);
        assert_ne!(first.refresh, second.refresh);
    }

    #[test]
    fn test_verify_rejects_wrong_type() {
        let issuer = TokenIssuer::new(SECRET, "identity-service");
        let pair = issuer.issue("user123", "member", &lifetimes(), Utc::now()).unwrap();

        let result = issuer.verify(&pair.access, TokenType::Refresh);
        assert_eq!(
            result.unwrap_err(),
            JwtError::WrongTokenType {
                expected: "refresh",
                actual: "access",
            }
        );
    }

    #[test]
    fn test_verify_rejects_foreign_issuer() {
        let ours = TokenIssuer::new(SECRET, "identity-service");
        let theirs = TokenIssuer::new(SECRET, "another-service");
        let pair = theirs.issue("user123", "member", &lifetimes(), Utc::now()).unwrap();

        let result = ours.verify(&pair.refresh, TokenType::Refresh);
        assert_eq!(result.unwrap_err(), JwtError::InvalidIssuer);
    }

    #[test]
    fn test_verify_rejects_expired_refresh() {
        let issuer = TokenIssuer::new(SECRET, "identity-service");
        let issued_long_ago = Utc::now() - Duration::days(8);
        let pair = issuer
            .issue("user123", "member", &lifetimes(), issued_long_ago)
            .unwrap();

        let result = issuer.verify(&pair.refresh, TokenType::Refresh);
        assert_eq!(result.unwrap_err(), JwtError::TokenExpired);
    }

    #[test]
    fn test_verify_rejects_corrupted_signature() {
        let issuer = TokenIssuer::new(SECRET, "identity-service");
        let pair = issuer.issue("user123", "member", &lifetimes(), Utc::now()).unwrap();

        let mut corrupted = pair.refresh.into_bytes();
        let last = corrupted.len() - 2;
        corrupted[last] = if corrupted[last] == b'A' { b'B' } else { b'A' };
        let corrupted = String::from_utf8(corrupted).unwrap();

        assert!(issuer.verify(&corrupted, TokenType::Refresh).is_err());
    }
}
