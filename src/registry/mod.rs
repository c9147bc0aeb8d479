pub mod memory;
#[cfg(windows)]
pub mod windows;

use std::io;

use crate::scope::Hive;
use crate::sec::Security;

/// Errors reported by a registry backend.
///
/// `NotFound` is a structural signal derived from the OS status code, never
/// from matching error message text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Key or value not found: {0:?}")]
    NotFound(String, #[source] io::Error),

    #[error("Permission denied for {0:?}")]
    PermissionDenied(String, #[source] io::Error),

    #[error("Value {0:?} does not hold a string")]
    NotAString(String),

    #[error("Invalid null found in {0:?}")]
    InvalidNul(String),

    #[error("Invalid UTF-16")]
    InvalidUtf16(#[from] std::string::FromUtf16Error),

    #[error("An unknown IO error occurred for {0:?}")]
    Unknown(String, #[source] io::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_, _) => true,
            _ => false,
        }
    }
}

/// Access to a registry. Implementations connect [`StartupManager`] either to
/// the live Windows registry or to an in-memory store.
///
/// [`StartupManager`]: crate::StartupManager
pub trait Registry {
    type Key: RegistryKey;

    /// Opens `path` under `hive` with the given access rights. The returned
    /// key is released when dropped.
    fn open(&self, hive: Hive, path: &str, sec: Security) -> Result<Self::Key, Error>;
}

/// An open registry key, scoped to a single operation.
pub trait RegistryKey {
    fn set_string(&self, name: &str, data: &str) -> Result<(), Error>;

    fn get_string(&self, name: &str) -> Result<String, Error>;

    fn delete_value(&self, name: &str) -> Result<(), Error>;

    fn value_names(&self) -> Result<Vec<String>, Error>;
}
