//! Operations the UI invokes.
//!
//! Each sub-module groups related commands by domain. Every command takes the
//! [`SharedState`](crate::state::SharedState) and starts with
//! [`enter`](crate::state::enter), so a banned visitor is refused before any
//! other check.

pub mod accounts;
pub mod admin;
pub mod characters;
pub mod chat;
pub mod images;
pub mod settings;
