use std::collections::BTreeMap;
use std::io;
use std::path::{self, PathBuf};

use crate::registry::{self, Registry, RegistryKey};
use crate::scope::StartupScope;
use crate::sec::Security;

/// A program registered (or to be registered) for launch at startup.
///
/// `name` is the registry value name; `command` is the path of the executable
/// to launch. The command is normalized to an absolute path when the entry is
/// added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupEntry {
    pub name: String,
    pub command: String,
}

impl StartupEntry {
    pub fn new<N, C>(name: N, command: C) -> StartupEntry
    where
        N: Into<String>,
        C: Into<String>,
    {
        StartupEntry {
            name: name.into(),
            command: command.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Startup entry name cannot be empty")]
    EmptyName,

    #[error("Invalid command path: {0:?}")]
    InvalidCommandPath(PathBuf, #[source] io::Error),

    #[error("Executable does not exist: {0:?}")]
    ExecutableNotFound(PathBuf),

    #[error("Failed to open startup key {0}")]
    Access(StartupScope, #[source] registry::Error),

    #[error("Failed to set startup value {0:?}")]
    Write(String, #[source] registry::Error),

    #[error("Failed to enumerate startup values in {0}")]
    Read(StartupScope, #[source] registry::Error),

    #[error("Failed to delete startup value {0:?}")]
    Delete(String, #[source] registry::Error),

    #[error("Startup entry {0:?} not found in {1}")]
    EntryNotFound(String, StartupScope),

    #[error("Startup entry {name:?} not found in any startup location")]
    NotFoundAnywhere {
        name: String,
        /// The failure observed in each scope, in [`StartupScope::ALL`] order.
        failures: Vec<(StartupScope, Error)>,
    },
}

/// Manages startup program registrations over an injected [`Registry`].
///
/// Every operation re-resolves its scope and opens the backing key for just
/// that call; no registry state is held between calls.
#[derive(Debug, Clone)]
pub struct StartupManager<R: Registry> {
    registry: R,
}

#[cfg(windows)]
impl StartupManager<crate::registry::windows::SystemRegistry> {
    /// A manager over the registry of the running system.
    pub fn system() -> Self {
        StartupManager::new(crate::registry::windows::SystemRegistry)
    }
}

impl<R: Registry> StartupManager<R> {
    pub fn new(registry: R) -> StartupManager<R> {
        StartupManager { registry }
    }

    /// Registers `entry` for launch in `scope`.
    ///
    /// The command is made absolute and must exist on disk at the time of the
    /// call. An existing value with the same name is overwritten; no other
    /// value is touched.
    pub fn add(&self, entry: &StartupEntry, scope: StartupScope) -> Result<(), Error> {
        if entry.name.is_empty() {
            return Err(Error::EmptyName);
        }

        let command = path::absolute(&entry.command)
            .map_err(|e| Error::InvalidCommandPath(PathBuf::from(&entry.command), e))?;

        if !command.exists() {
            return Err(Error::ExecutableNotFound(command));
        }

        let (hive, key_path) = scope.location();
        let key = self
            .registry
            .open(hive, key_path, Security::Write)
            .map_err(|e| Error::Access(scope, e))?;

        log::debug!("registering {:?} in {}", entry.name, scope);
        key.set_string(&entry.name, &command.to_string_lossy())
            .map_err(|e| Error::Write(entry.name.clone(), e))
    }

    /// Removes the value named `name` from `scope`.
    pub fn remove(&self, name: &str, scope: StartupScope) -> Result<(), Error> {
        let (hive, key_path) = scope.location();
        let key = self
            .registry
            .open(hive, key_path, Security::Write)
            .map_err(|e| Error::Access(scope, e))?;

        log::debug!("removing {:?} from {}", name, scope);
        match key.delete_value(name) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(Error::EntryNotFound(name.to_string(), scope)),
            Err(e) => Err(Error::Delete(name.to_string(), e)),
        }
    }

    /// Removes `name` from every startup scope it can be found in.
    ///
    /// Callers rarely know which scope an entry was registered under, so this
    /// tries all four. Succeeds if at least one removal went through; on total
    /// failure the error carries the outcome for every scope.
    pub fn remove_from_all(&self, name: &str) -> Result<(), Error> {
        let mut removed = false;
        let mut failures = Vec::new();

        for &scope in StartupScope::ALL.iter() {
            match self.remove(name, scope) {
                Ok(()) => removed = true,
                Err(e) => failures.push((scope, e)),
            }
        }

        if removed {
            Ok(())
        } else {
            Err(Error::NotFoundAnywhere {
                name: name.to_string(),
                failures,
            })
        }
    }

    /// Lists the entries registered in `scope` as a name to command map.
    ///
    /// Values that cannot be read as a string are skipped; a partial listing
    /// beats no listing.
    pub fn list(&self, scope: StartupScope) -> Result<BTreeMap<String, String>, Error> {
        let (hive, key_path) = scope.location();
        let key = self
            .registry
            .open(hive, key_path, Security::Read)
            .map_err(|e| Error::Access(scope, e))?;

        let names = key.value_names().map_err(|e| Error::Read(scope, e))?;

        let mut entries = BTreeMap::new();
        for name in names {
            if let Ok(command) = key.get_string(&name) {
                entries.insert(name, command);
            }
        }

        Ok(entries)
    }

    /// Lists every startup scope that is reachable and non-empty.
    ///
    /// Scopes that fail to list (commonly HKLM without administrator rights)
    /// are omitted rather than failing the whole aggregate.
    pub fn list_all(&self) -> BTreeMap<StartupScope, BTreeMap<String, String>> {
        let mut all = BTreeMap::new();

        for &scope in StartupScope::ALL.iter() {
            match self.list(scope) {
                Ok(entries) if !entries.is_empty() => {
                    all.insert(scope, entries);
                }
                _ => {}
            }
        }

        all
    }

    /// Whether a startup entry named `name` is registered in `scope`.
    pub fn is_registered(&self, name: &str, scope: StartupScope) -> Result<bool, Error> {
        let (hive, key_path) = scope.location();
        let key = self
            .registry
            .open(hive, key_path, Security::Read)
            .map_err(|e| Error::Access(scope, e))?;

        match key.get_string(name) {
            Ok(_) => Ok(true),
            // A non-string value under a Run key is not a launch command.
            Err(registry::Error::NotAString(_)) => Ok(false),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(Error::Read(scope, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::memory::{Data, MemoryRegistry};
    use crate::scope::Hive;
    use std::path;

    fn manager() -> (StartupManager<MemoryRegistry>, MemoryRegistry) {
        let registry = MemoryRegistry::new();
        (StartupManager::new(registry.clone()), registry)
    }

    fn temp_exe() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    fn abs(path: &std::path::Path) -> String {
        path::absolute(path).unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn add_then_list_round_trip() {
        let (manager, _) = manager();
        let exe = temp_exe();

        for &scope in StartupScope::ALL.iter() {
            let entry = StartupEntry::new("TestApp", exe.path().to_string_lossy());
            manager.add(&entry, scope).unwrap();

            let entries = manager.list(scope).unwrap();
            assert_eq!(entries.get("TestApp"), Some(&abs(exe.path())));
        }
    }

    #[test]
    fn add_rejects_empty_name_in_every_scope() {
        let (manager, _) = manager();
        let exe = temp_exe();

        for &scope in StartupScope::ALL.iter() {
            let entry = StartupEntry::new("", exe.path().to_string_lossy());
            match manager.add(&entry, scope) {
                Err(Error::EmptyName) => {}
                other => panic!("expected EmptyName, got {:?}", other),
            }
        }
    }

    #[test]
    fn add_rejects_missing_executable() {
        let (manager, _) = manager();
        let entry = StartupEntry::new("TestApp", "/no/such/executable");

        match manager.add(&entry, StartupScope::CurrentUserRun) {
            Err(Error::ExecutableNotFound(path)) => assert!(path.is_absolute()),
            other => panic!("expected ExecutableNotFound, got {:?}", other),
        }
    }

    #[test]
    fn add_rejects_empty_command_path() {
        let (manager, _) = manager();
        let entry = StartupEntry::new("TestApp", "");

        match manager.add(&entry, StartupScope::CurrentUserRun) {
            Err(Error::InvalidCommandPath(_, _)) => {}
            other => panic!("expected InvalidCommandPath, got {:?}", other),
        }
    }

    #[test]
    fn add_overwrites_existing_entry() {
        let (manager, _) = manager();
        let first = temp_exe();
        let second = temp_exe();

        let scope = StartupScope::CurrentUserRunOnce;
        manager
            .add(&StartupEntry::new("TestApp", first.path().to_string_lossy()), scope)
            .unwrap();
        manager
            .add(&StartupEntry::new("TestApp", second.path().to_string_lossy()), scope)
            .unwrap();

        let entries = manager.list(scope).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("TestApp"), Some(&abs(second.path())));
    }

    #[test]
    fn add_without_hive_access_fails() {
        let (manager, registry) = manager();
        registry.deny(Hive::LocalMachine);
        let exe = temp_exe();

        let entry = StartupEntry::new("TestApp", exe.path().to_string_lossy());
        match manager.add(&entry, StartupScope::AllUsersRun) {
            Err(Error::Access(StartupScope::AllUsersRun, _)) => {}
            other => panic!("expected Access, got {:?}", other),
        }
    }

    #[test]
    fn remove_unknown_name_is_entry_not_found() {
        let (manager, _) = manager();

        match manager.remove("Ghost", StartupScope::CurrentUserRun) {
            Err(Error::EntryNotFound(name, StartupScope::CurrentUserRun)) => {
                assert_eq!(name, "Ghost")
            }
            other => panic!("expected EntryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn remove_deletes_only_the_named_value() {
        let (manager, _) = manager();
        let exe = temp_exe();
        let scope = StartupScope::CurrentUserRun;

        manager
            .add(&StartupEntry::new("KeepMe", exe.path().to_string_lossy()), scope)
            .unwrap();
        manager
            .add(&StartupEntry::new("DropMe", exe.path().to_string_lossy()), scope)
            .unwrap();

        manager.remove("DropMe", scope).unwrap();

        let entries = manager.list(scope).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("KeepMe"));
    }

    #[test]
    fn remove_from_all_succeeds_when_present_in_one_scope() {
        let (manager, _) = manager();
        let exe = temp_exe();

        manager
            .add(
                &StartupEntry::new("TestApp", exe.path().to_string_lossy()),
                StartupScope::AllUsersRunOnce,
            )
            .unwrap();

        manager.remove_from_all("TestApp").unwrap();
        assert!(manager
            .list(StartupScope::AllUsersRunOnce)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn remove_from_all_reports_every_scope_on_total_failure() {
        let (manager, _) = manager();

        match manager.remove_from_all("Ghost") {
            Err(Error::NotFoundAnywhere { name, failures }) => {
                assert_eq!(name, "Ghost");
                assert_eq!(failures.len(), 4);
                for (scope, error) in &failures {
                    match error {
                        Error::EntryNotFound(_, error_scope) => assert_eq!(scope, error_scope),
                        other => panic!("expected EntryNotFound, got {:?}", other),
                    }
                }
            }
            other => panic!("expected NotFoundAnywhere, got {:?}", other),
        }
    }

    #[test]
    fn list_skips_non_string_values() {
        let (manager, registry) = manager();
        let exe = temp_exe();
        let scope = StartupScope::CurrentUserRun;
        let (hive, key_path) = scope.location();

        registry.insert(hive, key_path, "Flags", Data::U32(1));
        registry.insert(hive, key_path, "Blob", Data::Binary(vec![1, 2, 3]));
        manager
            .add(&StartupEntry::new("TestApp", exe.path().to_string_lossy()), scope)
            .unwrap();

        let entries = manager.list(scope).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("TestApp"));
    }

    #[test]
    fn list_without_hive_access_fails() {
        let (manager, registry) = manager();
        registry.deny(Hive::LocalMachine);

        match manager.list(StartupScope::AllUsersRun) {
            Err(Error::Access(StartupScope::AllUsersRun, _)) => {}
            other => panic!("expected Access, got {:?}", other),
        }
    }

    #[test]
    fn list_all_omits_empty_and_unreachable_scopes() {
        let (manager, registry) = manager();
        registry.deny(Hive::LocalMachine);
        let exe = temp_exe();

        manager
            .add(
                &StartupEntry::new("TestApp", exe.path().to_string_lossy()),
                StartupScope::CurrentUserRun,
            )
            .unwrap();

        let all = manager.list_all();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key(&StartupScope::CurrentUserRun));
    }

    #[test]
    fn is_registered_reflects_presence() {
        let (manager, registry) = manager();
        let exe = temp_exe();
        let scope = StartupScope::CurrentUserRun;

        assert!(!manager.is_registered("TestApp", scope).unwrap());

        manager
            .add(&StartupEntry::new("TestApp", exe.path().to_string_lossy()), scope)
            .unwrap();
        assert!(manager.is_registered("TestApp", scope).unwrap());

        // A non-string value with a matching name is not a startup entry.
        let (hive, key_path) = scope.location();
        registry.insert(hive, key_path, "Flags", Data::U32(1));
        assert!(!manager.is_registered("Flags", scope).unwrap());
    }
}
