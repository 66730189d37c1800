//! Service layer between handlers and `shadow_core`.

pub mod auth;
pub mod cookies;
