//! Reconciler Networking - Backend HTTP client and authoritative data fetcher

pub mod api;
pub mod http;

pub use api::{Fetcher, Query};
pub use http::BackendClient;
