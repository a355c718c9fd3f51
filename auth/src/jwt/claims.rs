use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Purpose of a signed token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every access and refresh token.
///
/// All fields are required: a token missing any of them fails to decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject identifier
    pub sub: String,

    /// Role partition the subject belongs to
    pub role: String,

    pub token_type: TokenType,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Unique token identifier
    pub jti: String,
}

impl Claims {
    /// Build claims issued at `issued_at` and valid for `lifetime`.
    ///
    /// Timestamps are truncated to whole seconds, matching the JWT encoding.
    pub fn new(
        subject: impl ToString,
        role: impl ToString,
        token_type: TokenType,
        issuer: impl ToString,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        let iat = issued_at.timestamp();

        Self {
            sub: subject.to_string(),
            role: role.to_string(),
            token_type,
            iss: issuer.to_string(),
            iat,
            exp: iat + lifetime.num_seconds(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Expiry as a timestamp, `None` if `exp` is out of range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_claims() {
        let issued_at = DateTime::from_timestamp(1_700_000_000, 500).unwrap();
        let claims = Claims::new(
            "user123",
            "member",
            TokenType::Access,
            "identity-service",
            issued_at,
            Duration::minutes(30),
        );

        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.role, "member");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.iss, "identity-service");
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
        assert_eq!(
            claims.expires_at(),
            DateTime::from_timestamp(1_700_000_000 + 30 * 60, 0)
        );
    }

    #[test]
    fn test_every_claims_gets_fresh_jti() {
        let now = Utc::now();
        let first = Claims::new("u", "member", TokenType::Refresh, "iss", now, Duration::days(7));
        let second = Claims::new("u", "member", TokenType::Refresh, "iss", now, Duration::days(7));

        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_token_type_serializes_lowercase() {
        let value = serde_json::to_value(TokenType::Refresh).unwrap();
        assert_eq!(value, serde_json::json!("refresh"));
    }
}
