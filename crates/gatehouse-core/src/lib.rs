//! Gatehouse Core Library
//!
//! Shared functionality for gatehouse components:
//! - Closed access result taxonomy and attempt types
//! - Entity status enums (devices, badges, users)
//! - Permission schedule matching
//! - Common error types

pub mod error;
pub mod result;
pub mod schedule;
pub mod status;
pub mod time;

pub use error::{Error, Result};
pub use result::{AccessResult, AttemptType};
pub use schedule::Schedule;
pub use status::{BadgeStatus, DeviceKind, DeviceStatus, UserStatus};
pub use time::{format_timestamp, unix_timestamp};
