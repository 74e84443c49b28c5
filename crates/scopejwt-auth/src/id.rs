//! Token id generation.

use uuid::Uuid;

/// Produces unique `jti` values.
pub trait IdGenerator: Send + Sync {
    /// A fresh id, unique across all tokens issued by the process.
    fn generate(&self) -> String;
}

/// Random version 4 UUIDs in hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}
