//! # hamdam-shared
//!
//! Identifiers, constants and the pure policy rules (subscription math and
//! reply pricing) shared by the store and the client crates.

pub mod constants;
pub mod error;
pub mod premium;
pub mod pricing;
pub mod types;

pub use error::SharedError;
