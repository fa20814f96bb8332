//! Core domain + application logic for the role-mention bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the SQLite
//! role table live behind ports (traits) implemented in adapter crates.

pub mod app;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod gateway;
pub mod logging;
pub mod mention;
pub mod router;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::{Error, Result};
