//! Network policy for the sandcat proxy.
//!
//! [`config`] holds the settings document types and loader, [`pattern`] the
//! host glob matcher, [`evaluator`] the first-match-wins rule engine, and
//! [`reload`] the atomic snapshot swap used for hot reload.

pub mod config;
pub mod evaluator;
pub mod pattern;
pub mod reload;
