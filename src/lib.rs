//! Identity store, credential hashing and session tokens behind a small
//! HTTP surface.

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod state;
