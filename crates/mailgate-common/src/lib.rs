//! # Mailgate Common
//!
//! Shared types, errors, and constants used by the Mailgate relay.
//!
//! ## Modules
//! - `types` - Form definitions and API response bodies
//! - `error` - Relay error taxonomy and its HTTP status mapping
//! - `constants` - Defaults, header names, and captcha endpoints

pub mod constants;
pub mod error;
pub mod types;

pub use error::RelayError;
pub use types::*;
