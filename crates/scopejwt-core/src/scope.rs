//! Scope kinds and keys.
//!
//! Kinds are ordered from coarse to fine: `Default < Website < Group < Store`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScopeError;

/// The tier a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// The global, process-wide scope.
    Default,
    /// A website, the tenant tier.
    Website,
    /// A store group inside a website.
    Group,
    /// A single store view.
    Store,
}

impl ScopeKind {
    /// Returns the lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Website => "website",
            Self::Group => "group",
            Self::Store => "store",
        }
    }

    const fn tag(self) -> u64 {
        match self {
            Self::Default => 1,
            Self::Website => 2,
            Self::Group => 3,
            Self::Store => 4,
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeKind {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "website" | "websites" => Ok(Self::Website),
            "group" | "groups" => Ok(Self::Group),
            "store" | "stores" => Ok(Self::Store),
            _ => Err(ScopeError::UnknownKind(s.to_string())),
        }
    }
}

/// A scope kind paired with a numeric id.
///
/// Two keys are equal iff kind and id match. [`ScopeKey::to_u64`] packs
/// both into a stable integer that never changes between runs. Keys
/// order by kind first, then id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeKey {
    kind: ScopeKind,
    id: u32,
}

impl ScopeKey {
    /// The default scope, `default:0`.
    pub const DEFAULT: Self = Self {
        kind: ScopeKind::Default,
        id: 0,
    };

    /// Create a key from a kind and an id.
    ///
    /// The id of the default scope is always normalized to 0.
    #[must_use]
    pub const fn new(kind: ScopeKind, id: u32) -> Self {
        match kind {
            ScopeKind::Default => Self::DEFAULT,
            _ => Self { kind, id },
        }
    }

    /// Shorthand for a website scope.
    #[must_use]
    pub const fn website(id: u32) -> Self {
        Self::new(ScopeKind::Website, id)
    }

    /// Shorthand for a store group scope.
    #[must_use]
    pub const fn group(id: u32) -> Self {
        Self::new(ScopeKind::Group, id)
    }

    /// Shorthand for a store scope.
    #[must_use]
    pub const fn store(id: u32) -> Self {
        Self::new(ScopeKind::Store, id)
    }

    /// The scope kind.
    #[must_use]
    pub const fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// The numeric scope id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns `true` for the default scope.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        matches!(self.kind, ScopeKind::Default)
    }

    /// Pack the key into a stable `u64`: kind tag in the upper 32 bits, id below.
    #[must_use]
    pub const fn to_u64(&self) -> u64 {
        (self.kind.tag() << 32) | self.id as u64
    }
}

impl Default for ScopeKey {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeKey({self})")
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for ScopeKey {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = match s.split_once(':') {
            Some((kind, id)) => (kind, Some(id)),
            None => (s, None),
        };
        let kind = ScopeKind::from_str(kind.trim())?;
        let id = match id {
            Some(id) => id
                .trim()
                .parse::<u32>()
                .map_err(|_| ScopeError::InvalidId(id.to_string()))?,
            None if kind == ScopeKind::Default => 0,
            None => return Err(ScopeError::InvalidId(String::new())),
        };
        if kind == ScopeKind::Default && id != 0 {
            return Err(ScopeError::DefaultWithId(id));
        }
        Ok(Self::new(kind, id))
    }
}

impl TryFrom<String> for ScopeKey {
    type Error = ScopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<ScopeKey> for String {
    fn from(key: ScopeKey) -> Self {
        key.to_string()
    }
}
