//! Scope-aware JWT authentication.
//!
//! This crate issues, verifies and revokes signed bearer tokens for many
//! tenant scopes inside one process:
//!
//! - Signing methods for HMAC, RSA and ECDSA at 256/384/512 bits
//! - Key material from secrets, PEM buffers or files, or parsed keys
//! - A per-scope configuration cache with fallback to the default scope
//!   and optional lazy population from a backend
//! - Pluggable revocation stores
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Middleware     │────▶│     Service      │
//! │   (gateway)      │     │  scope → config  │
//! └──────────────────┘     └───┬──────────┬───┘
//!                              │          │
//!                 ┌────────────▼───┐  ┌───▼──────────────┐
//!                 │ SigningMethod  │  │    Blacklist     │
//!                 │ + Key          │  │ (revoked tokens) │
//!                 └────────────────┘  └──────────────────┘
//!                              ▲
//!                 ┌────────────┴───┐
//!                 │ ConfigResolver │  on cache miss, once
//!                 └────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use scopejwt_auth::{options, Claims, Key, Service};
//! use scopejwt_core::ScopeKey;
//!
//! # async fn example() -> scopejwt_auth::Result<()> {
//! let website = ScopeKey::website(1);
//! let service = Service::new([
//!     options::with_key(website, Key::hmac(b"a secret of at least thirty-two bytes")),
//!     options::with_expiration(website, Duration::from_secs(300)),
//! ])?;
//!
//! let token = service
//!     .new_token(website, Claims::new().with("sub", "alice"))
//!     .await?;
//! let parsed = service.parse_scoped(website, token.raw()).await?;
//! assert_eq!(parsed.claims.get_str("sub"), Some("alice"));
//!
//! service.logout(&parsed)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod algorithm;
pub mod blacklist;
pub mod claims;
pub mod config;
pub mod error;
pub mod handler;
pub mod id;
pub mod key;
pub mod options;
pub mod resolver;
pub mod service;
pub mod signing;
pub mod token;

pub use algorithm::{Algorithm, KeyFamily};
pub use blacklist::{Blacklist, MapBlacklist, NullBlacklist, ShardedBlacklist};
pub use claims::Claims;
pub use config::{ClaimsTemplate, ScopedConfig, Verifier};
pub use error::{AuthError, ErrorClass, Rejection, Result};
pub use handler::{DefaultErrorHandler, ErrorHandler, ErrorResponse, REJECTED_MESSAGE};
pub use id::{IdGenerator, UuidGenerator};
pub use key::Key;
pub use options::{ConfigChange, ServiceOption};
pub use resolver::{ConfigResolver, StaticResolver};
pub use service::Service;
pub use signing::{signing_method, HmacFast, SigningMethod};
pub use token::{Header, Token};
