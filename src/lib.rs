//! Workspace placeholder crate.
//!
//! Re-exports the `core-service` façade behind the `desktop-shims` feature so
//! host applications can depend on a single crate instead of wiring each
//! workspace member individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
