//! File-based route resolution
//!
//! The routes root is a directory tree of handler modules:
//! - `name.<ext>` handles `/name`
//! - `dir/index.<ext>` handles `/dir`
//! - `dir/[param].<ext>` handles `/dir/<anything>` when no static file matches,
//!   exposing the last URL segment as `params.<param>`

pub mod dispatch;
pub mod fs;
pub mod loader;
pub mod module;
pub mod resolve;
pub mod translate;

pub use dispatch::{Dispatched, Dispatcher, RouteRequest};
pub use fs::{DiskFs, RouteFs};
pub use loader::ReloadPolicy;
pub use module::{HandlerOutput, HandlerResponse};
