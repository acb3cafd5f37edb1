//! Guild role sync bridge
//!
//! Mirrors application role assignments onto guild member roles. Syncs are
//! triggered over HTTP (`SYNC_USER`) or by gateway events (member join,
//! message), and the service can relay messages into configured channels.

pub mod api;
pub mod config;
pub mod errors;
pub mod guild;
pub mod handlers;
pub mod health;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod reconcile;
pub mod relay;
pub mod store;
