//! esfuse-core - Core types and traits for esfuse
//!
//! This crate provides the domain types, the search client interface,
//! configuration and error handling shared by the esfuse crates.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{Result, SearchError};
pub use traits::*;
pub use types::*;
