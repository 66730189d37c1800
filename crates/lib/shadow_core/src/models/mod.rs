//! Domain models shared across the workspace.

pub mod auth;
