//! Shared foundational types used across the ferrite register-block toolchain.
//!
//! This crate provides core types including interned identifiers, content hashing,
//! bit-arithmetic helpers, and common result types.

#![warn(missing_docs)]

pub mod bits;
pub mod hash;
pub mod ident;
pub mod result;

pub use bits::{clog2, width_mask};
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use result::{FerriteResult, InternalError};
