//! Shared client-side state modules.
//!
//! DESIGN
//! ======
//! State is split by domain (`chat`, `connection`) so individual views can
//! depend on small focused models. Structs here are plain data with mutation
//! methods; callers hold them in `RwSignal`s and the drivers in `crate::net`
//! are the only writers.

pub mod chat;
pub mod connection;
