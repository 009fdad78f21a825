//! Authentication utilities library
//!
//! Provides the authentication building blocks of the account service:
//! - Token codec (HS256 JWT) with a discriminated decode error
//! - Session resolution from a bearer token or a session cookie
//! - Password hashing (Argon2id), password policy and random secrets
//!
//! # Examples
//!
//! ## Session tokens
//! ```
//! use auth::{Claims, EffectiveSession, JwtHandler, SessionResolver};
//! use chrono::{Duration, Utc};
//!
//! let codec = JwtHandler::new(b"secret_key_at_least_32_bytes_long!");
//! let claims = Claims::for_session("user123", "session-1", Utc::now() + Duration::hours(1));
//! let token = codec.encode(&claims).unwrap();
//!
//! let resolver = SessionResolver::new(codec);
//! let header = format!("Bearer {}", token);
//! assert_eq!(
//!     resolver.resolve(Some(&header), Some("cookie-session")),
//!     EffectiveSession::Bearer("session-1".to_string()),
//! );
//! ```
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod session;

pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::generate_secret;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PasswordPolicy;
pub use password::PolicyViolation;
pub use session::EffectiveSession;
pub use session::SessionResolver;
