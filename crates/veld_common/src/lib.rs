//! Shared foundational types used across the VELD elaboration core.
//!
//! This crate provides interned identifiers for design entity names and the
//! common result type for internal (non-user-facing) errors.

#![warn(missing_docs)]

pub mod ident;
pub mod result;

pub use ident::{Ident, Interner};
pub use result::{InternalError, VeldResult};
