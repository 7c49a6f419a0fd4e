//! Core types shared by the garage-console crates.
//!
//! This crate provides the `Result` alias used for library-internal errors
//! and the [`SessionStore`] capability through which authentication state
//! is read and written without depending on a particular session backend.

pub mod error;
pub mod session;

pub use error::Result;
pub use session::{MemorySession, SessionError, SessionKey, SessionStore};
