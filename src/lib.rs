//! Session and role-based access control core for a multi-role hospital management client.
//!
//! Data flows one way: `transport` → `identity::SessionStore` → {`identity::authorize`,
//! `navigation::resolve`} → rendered outcome. Mutations flow back through the store.

pub mod error;
pub mod config;
pub mod routes;
pub mod transport;
pub mod identity;
pub mod navigation;
/// Scripted in-memory transport. A test seam for the store and navigator; not for production wiring.
pub mod testing;
pub mod cli;
