//! An in-memory registry backend, for tests and non-Windows development.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use crate::registry::{Error, Registry, RegistryKey};
use crate::scope::Hive;
use crate::sec::Security;

/// The subset of registry value types a Run key can realistically hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    String(String),
    U32(u32),
    Binary(Vec<u8>),
}

type Store = HashMap<(Hive, String), BTreeMap<String, Data>>;

/// A registry held entirely in memory. Cloning yields a handle to the same
/// store, so a test can keep one clone and hand another to a manager.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    store: Arc<Mutex<Store>>,
    denied: Arc<Mutex<HashSet<Hive>>>,
}

impl MemoryRegistry {
    pub fn new() -> MemoryRegistry {
        MemoryRegistry::default()
    }

    /// Makes every subsequent open against `hive` fail with
    /// `PermissionDenied`, simulating a caller without rights to that hive.
    pub fn deny(&self, hive: Hive) {
        self.denied.lock().unwrap().insert(hive);
    }

    /// Seeds a raw value without going through an open key.
    pub fn insert(&self, hive: Hive, path: &str, name: &str, data: Data) {
        self.store
            .lock()
            .unwrap()
            .entry((hive, path.to_string()))
            .or_default()
            .insert(name.to_string(), data);
    }
}

impl Registry for MemoryRegistry {
    type Key = MemoryKey;

    fn open(&self, hive: Hive, path: &str, sec: Security) -> Result<MemoryKey, Error> {
        if self.denied.lock().unwrap().contains(&hive) {
            return Err(Error::PermissionDenied(
                format!(r"{}\{}", hive, path),
                io::Error::from(io::ErrorKind::PermissionDenied),
            ));
        }

        // The Run/RunOnce keys always exist on a real system; model that by
        // materializing the key on open.
        self.store
            .lock()
            .unwrap()
            .entry((hive, path.to_string()))
            .or_default();

        Ok(MemoryKey {
            store: Arc::clone(&self.store),
            slot: (hive, path.to_string()),
            sec,
        })
    }
}

#[derive(Debug)]
pub struct MemoryKey {
    store: Arc<Mutex<Store>>,
    slot: (Hive, String),
    sec: Security,
}

impl MemoryKey {
    fn check(&self, needed: Security) -> Result<(), Error> {
        if self.sec.contains(needed) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(
                format!(r"{}\{}", self.slot.0, self.slot.1),
                io::Error::from(io::ErrorKind::PermissionDenied),
            ))
        }
    }

    fn not_found(name: &str) -> Error {
        Error::NotFound(name.to_string(), io::Error::from(io::ErrorKind::NotFound))
    }
}

impl RegistryKey for MemoryKey {
    fn set_string(&self, name: &str, data: &str) -> Result<(), Error> {
        self.check(Security::SetValue)?;
        self.store
            .lock()
            .unwrap()
            .entry(self.slot.clone())
            .or_default()
            .insert(name.to_string(), Data::String(data.to_string()));
        Ok(())
    }

    fn get_string(&self, name: &str) -> Result<String, Error> {
        self.check(Security::QueryValue)?;
        let store = self.store.lock().unwrap();
        match store.get(&self.slot).and_then(|values| values.get(name)) {
            Some(Data::String(s)) => Ok(s.clone()),
            Some(_) => Err(Error::NotAString(name.to_string())),
            None => Err(MemoryKey::not_found(name)),
        }
    }

    fn delete_value(&self, name: &str) -> Result<(), Error> {
        self.check(Security::SetValue)?;
        let mut store = self.store.lock().unwrap();
        match store.get_mut(&self.slot).and_then(|values| values.remove(name)) {
            Some(_) => Ok(()),
            None => Err(MemoryKey::not_found(name)),
        }
    }

    fn value_names(&self) -> Result<Vec<String>, Error> {
        self.check(Security::QueryValue)?;
        let store = self.store.lock().unwrap();
        Ok(store
            .get(&self.slot)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default())
    }
}
