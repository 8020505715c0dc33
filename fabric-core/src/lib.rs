//! Fabric Core
//!
//! Core library shared by the Fabric provider crates: the resource/state
//! value model, the provider trait, schema validation, diagnostics and the
//! wait-for-state poller used by long-running lifecycle operations.

pub mod diagnostics;
pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod waiter;
