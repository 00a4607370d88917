//! HTTP protocol layer module
//!
//! Response builders and content type detection, independent of routing.

pub mod mime;
pub mod response;

pub use response::{
    build_413_response, build_handler_response, build_not_found_response,
    build_returned_response,
};
