//! Networking modules for the HTTP API and the optional socket transport.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles REST calls, `connection` owns reachability and reconnection,
//! `pipeline` drives message sends, and `socket_client` is the queued socket
//! variant. `types` defines the shared wire schema.

pub mod api;
pub mod connection;
pub mod pipeline;
pub mod socket_client;
pub mod types;
