//! Error handling foundation for garage-console.
//!
//! Library code that talks to something outside the process (a session
//! backend, a directory server) returns `Result<T, SomeError>` from this
//! module so that failures carry a rootcause `Report`. Those reports are
//! logged where they are handled and translated into caller-facing errors
//! by the crate that owns the HTTP boundary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
