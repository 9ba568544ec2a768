//! Utility modules shared across cc-sandbox.

pub mod platform;
