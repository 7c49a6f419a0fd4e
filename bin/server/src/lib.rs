//! garage-console HTTP backend.
//!
//! Serves the authentication routes of the console and relays every other
//! `/api` request to the cluster admin API once the session is
//! authenticated.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod proxy;
