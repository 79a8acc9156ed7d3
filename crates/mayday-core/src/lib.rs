//! Core types and trait definitions for the Mayday alert service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod alert;
pub mod contact;
pub mod error;
pub mod gateway;
pub mod status;
pub mod store;

pub use error::{Error, Result};
