//! Access decision engine.
//!
//! Evaluates one access attempt end to end: an ordered sequence of
//! gates with early exit, a single centralized outcome→log mapper, and
//! a closed result taxonomy shared between the verdict and the log row.

pub mod evaluate;
pub mod outcome;


pub use evaluate::AccessEngine;
pub use outcome::{AccessAttempt, AccessVerdict};

/// Configuration key for the wrong-PIN threshold that triggers a lockout.
pub const CONFIG_MAX_ATTEMPTS: &str = "max_attempts";

/// Configuration key for the lockout duration in minutes.
pub const CONFIG_LOCK_DURATION_MINUTES: &str = "lock_duration_minutes";
