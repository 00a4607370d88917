//! Request handler module
//!
//! Bridges hyper requests to the route dispatcher and applies the
//! not-found policy for every dispatch failure.

pub mod request;

// Re-export main entry point
pub use request::handle_request;
