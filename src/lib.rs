#![deny(rust_2018_idioms)]

//! Register, deregister, and enumerate Windows startup programs held in the
//! HKCU/HKLM `Run` and `RunOnce` registry keys.
//!
//! All operations go through [`StartupManager`], which is generic over a
//! [`Registry`] backend: [`SystemRegistry`] talks to the live registry on
//! Windows, while [`registry::memory::MemoryRegistry`] backs tests and
//! non-Windows development.

mod manager;
pub mod registry;
mod scope;
mod sec;

pub use manager::{Error, StartupEntry, StartupManager};
pub use registry::{Registry, RegistryKey};
pub use scope::{Hive, StartupScope};
pub use sec::Security;

#[cfg(windows)]
pub use registry::windows::SystemRegistry;
