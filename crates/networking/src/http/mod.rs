//! Raw HTTP access to the platform backend

mod client;

pub use client::BackendClient;
