//! HTTP access to remote JSON endpoints.
//!
//! This module provides the `HttpClient` used by the fetch layer and the
//! `FetchError` taxonomy for transport, status and parse failures.

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::FetchError;
