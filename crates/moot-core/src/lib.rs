//! Core types and trait definitions for the Moot topic moderation core.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Persistence and the user directory sit behind the port traits in
//! [`store`]; the lifecycle rules live in [`service`].

pub mod engagement;
pub mod error;
pub mod post;
pub mod query;
pub mod service;
pub mod store;
pub mod topic;

pub use error::{Error, Result};
