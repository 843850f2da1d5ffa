//! Core pipeline for the group member harvester.
//!
//! Enumerates members (or recent message senders) of the groups an account can see,
//! filters them, persists deduplicated handles/ids to flat files, and replays stored
//! handles into a paced invite flow.
//!
//! This crate is intentionally framework-agnostic. The platform account and the bot
//! front end live behind ports (traits) implemented in adapter crates.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod filter;
pub mod formatting;
pub mod invite;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod progress;
pub mod session;
pub mod settings;
pub mod store;

pub use errors::{Error, PlatformError, Result};
