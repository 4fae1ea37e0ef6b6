//! Digest port for skill instruction bodies.

/// Turns an instruction body into the digest stored on `SkillRecord`.
///
/// Only the body is hashed: editing a manifest's description or properties
/// leaves the digest unchanged, while any change to the body text changes it.
/// Implementations must be deterministic so an unchanged body keeps its
/// digest across refreshes.
pub trait ContentHasher: Send + Sync {
    fn compute_hash(&self, content: &str) -> String;
}
