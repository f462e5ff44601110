//! Credential hashing with bcrypt. The stored form is the opaque bcrypt
//! string (`$2b$<cost>$<salt+digest>`); nothing else in the crate parses it.

use civic_core::error::{CoreError, CoreResult};

/// Hash a raw credential with a fresh salt at the given work factor.
pub fn hash_credential(raw: &str, cost: u32) -> CoreResult<String> {
    bcrypt::hash(raw, cost).map_err(|e| match e {
        bcrypt::BcryptError::CostNotAllowed(cost) => {
            CoreError::Config(format!("bcrypt cost {cost} is outside 4..=31"))
        }
        other => CoreError::Internal(other.into()),
    })
}

/// Check `raw` against a stored hash. Malformed stored values never verify.
pub fn verify_credential(raw: &str, stored: &str) -> bool {
    bcrypt::verify(raw, stored).unwrap_or(false)
}
