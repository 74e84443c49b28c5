//! Scope identifiers for scopejwt.
//!
//! A scope is the tenant partition a configuration or a request belongs
//! to. The auth crates only need two things from it: its kind and its
//! numeric id, which together form a [`ScopeKey`].
//!
//! # Example
//!
//! ```
//! use scopejwt_core::{ScopeKey, ScopeKind};
//!
//! let key: ScopeKey = "website:3".parse().unwrap();
//! assert_eq!(key.kind(), ScopeKind::Website);
//! assert_eq!(key.id(), 3);
//! assert_eq!(key.to_string(), "website:3");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod scope;

pub use error::{Result, ScopeError};
pub use scope::{ScopeKey, ScopeKind};
