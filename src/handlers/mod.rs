//! Transport-facing connection handlers

pub mod client;

pub use client::handle_client;
