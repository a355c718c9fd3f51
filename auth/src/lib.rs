//! Authentication utilities library
//!
//! Provides the credential and token primitives used by the identity service:
//! - Password hashing (Argon2id)
//! - JWT encoding and validation with a fixed issuer
//! - Access/refresh token pair issuance
//! - Token digests for server-side session records
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash));
//! assert!(!hasher.verify("not_my_password", &hash));
//! ```
//!
//! ## Token Pairs
//! ```
//! use auth::{TokenIssuer, TokenLifetimes, TokenType};
//! use chrono::{Duration, Utc};
//!
//! let issuer = TokenIssuer::new(b"secret_key_at_least_32_bytes_long!", "identity-service");
//! let lifetimes = TokenLifetimes::new(Duration::minutes(30), Duration::days(7));
//!
//! let pair = issuer.issue("user123", "member", &lifetimes, Utc::now()).unwrap();
//! let claims = issuer.verify(&pair.refresh, TokenType::Refresh).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```

pub mod digest;
pub mod issuer;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use digest::token_digest;
pub use issuer::TokenIssuer;
pub use issuer::TokenLifetimes;
pub use issuer::TokenPair;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::TokenType;
pub use password::PasswordError;
pub use password::PasswordHasher;
