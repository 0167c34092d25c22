//! # attache-client
//!
//! Browser-resident chat client core for the Attache personal AI assistant.
//!
//! This crate owns the two stateful layers between the UI and the backend:
//! the connection resilience manager (health probing, reconnection with
//! bounded exponential backoff, browser online/visibility signals) and the
//! chat message pipeline (optimistic transcript updates, send timeout with
//! cooperative cancellation, failure classification, speculative model
//! warmup). Rendering layers hold the state containers in `RwSignal`s and
//! only observe them; all mutation goes through the APIs here.
//!
//! Browser glue is gated behind the `hydrate` feature. Everything else is
//! plain Rust and tested natively.

pub mod net;
pub mod state;
