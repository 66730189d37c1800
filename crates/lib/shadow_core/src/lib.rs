//! # shadow_core
//!
//! Identity and session authority for ShadowHacker: credential checks,
//! signed session/admin tokens, federated account reconciliation and the
//! admin login rate limiter.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod oauth;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
