use std::fmt::Display;

/// Registry hives that hold startup locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hive {
    CurrentUser,
    LocalMachine,
}

impl Display for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
        })
    }
}

/// The four registry locations Windows consults for auto-started programs.
///
/// `RunOnce` values are deleted by Windows after a single execution; `Run`
/// values persist. The `AllUsers` scopes live under HKLM and usually need
/// administrator rights to modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StartupScope {
    CurrentUserRun,
    CurrentUserRunOnce,
    AllUsersRun,
    AllUsersRunOnce,
}

impl StartupScope {
    /// Every scope, in the order aggregate operations visit them.
    pub const ALL: [StartupScope; 4] = [
        StartupScope::CurrentUserRun,
        StartupScope::CurrentUserRunOnce,
        StartupScope::AllUsersRun,
        StartupScope::AllUsersRunOnce,
    ];

    /// The hive and subkey path backing this scope.
    ///
    /// The mapping is pure data. The match is exhaustive, so there is no
    /// fallback case for an unrecognized scope.
    pub fn location(self) -> (Hive, &'static str) {
        match self {
            StartupScope::CurrentUserRun => (
                Hive::CurrentUser,
                r"Software\Microsoft\Windows\CurrentVersion\Run",
            ),
            StartupScope::CurrentUserRunOnce => (
                Hive::CurrentUser,
                r"Software\Microsoft\Windows\CurrentVersion\RunOnce",
            ),
            StartupScope::AllUsersRun => (
                Hive::LocalMachine,
                r"SOFTWARE\Microsoft\Windows\CurrentVersion\Run",
            ),
            StartupScope::AllUsersRunOnce => (
                Hive::LocalMachine,
                r"SOFTWARE\Microsoft\Windows\CurrentVersion\RunOnce",
            ),
        }
    }
}

impl Display for StartupScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (hive, path) = self.location();
        write!(f, r"{}\{}", hive, path)
    }
}
