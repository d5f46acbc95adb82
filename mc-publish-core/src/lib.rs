//! Core types for the mc-publish HTTP layer.
//!
//! This crate provides the transport-agnostic pieces shared by the client
//! (`mc-publish-client`) and by every platform uploader built on it.
//!
//! ## Modules
//!
//! - [`body`]: Request body model and multi-part forms
//! - [`error`]: Soft/hard error tagging
//! - [`file`]: File references used as form attachments
//! - [`retry`]: Bounded retry loop for async operations
//! - [`secret`]: Opaque credential wrapper

mod body;
mod error;
mod file;
mod retry;
mod secret;

pub use body::*;
pub use error::*;
pub use file::*;
pub use retry::*;
pub use secret::*;
