//! Shared types

pub mod error;

pub use error::{GridError, Result};
