//! Client session layer for CVForge.
//!
//! Remembers a user's login (obfuscated, expiring after 30 days), signs
//! them back in silently once per app session, and talks to the remote
//! auth API. Resume generation and job analysis are server-side and not
//! part of this crate.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod storage;

pub use config::{Config, StorageBackend};
