//! The live Windows registry backend.

use std::io;
use std::ptr::null_mut;

use utfx::U16CString;
use winapi::shared::minwindef::HKEY;
use winapi::shared::winerror::ERROR_NO_MORE_ITEMS;
use winapi::um::winnt::{REG_EXPAND_SZ, REG_SZ};
use winapi::um::winreg::{
    RegCloseKey, RegDeleteValueW, RegEnumValueW, RegOpenKeyExW, RegQueryInfoKeyW,
    RegQueryValueExW, RegSetValueExW, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
};

use crate::registry::{Error, Registry, RegistryKey};
use crate::scope::Hive;
use crate::sec::Security;

/// Access to the registry of the running system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRegistry;

impl Registry for SystemRegistry {
    type Key = SystemKey;

    fn open(&self, hive: Hive, path: &str, sec: Security) -> Result<SystemKey, Error> {
        let wide = to_wide(path)?;
        let mut handle = null_mut();
        let result = unsafe { RegOpenKeyExW(as_hkey(hive), wide.as_ptr(), 0, sec.bits(), &mut handle) };

        if result != 0 {
            return Err(from_code(result, format!(r"{}\{}", hive, path)));
        }

        Ok(SystemKey {
            handle,
            path: format!(r"{}\{}", hive, path),
        })
    }
}

/// An open handle to a registry key, closed on drop.
#[derive(Debug)]
pub struct SystemKey {
    handle: HKEY,
    path: String,
}

impl Drop for SystemKey {
    fn drop(&mut self) {
        // No point checking the return value here.
        unsafe { RegCloseKey(self.handle) };
    }
}

impl RegistryKey for SystemKey {
    fn set_string(&self, name: &str, data: &str) -> Result<(), Error> {
        let wide_name = to_wide(name)?;
        let bytes = string_to_utf16_byte_vec(&to_wide(data)?);

        let result = unsafe {
            RegSetValueExW(
                self.handle,
                wide_name.as_ptr(),
                0,
                REG_SZ,
                bytes.as_ptr(),
                bytes.len() as u32,
            )
        };

        if result != 0 {
            return Err(from_code(result, name.to_string()));
        }

        Ok(())
    }

    fn get_string(&self, name: &str) -> Result<String, Error> {
        let wide_name = to_wide(name)?;

        // Get the required buffer size first.
        let mut sz: u32 = 0;
        let result = unsafe {
            RegQueryValueExW(
                self.handle,
                wide_name.as_ptr(),
                null_mut(),
                null_mut(),
                null_mut(),
                &mut sz,
            )
        };

        if result != 0 {
            return Err(from_code(result, name.to_string()));
        }

        let mut buf = vec![0u16; sz as usize / 2 + 1];
        let mut ty = 0u32;
        let mut len = (buf.len() * 2) as u32;
        let result = unsafe {
            RegQueryValueExW(
                self.handle,
                wide_name.as_ptr(),
                null_mut(),
                &mut ty,
                buf.as_mut_ptr() as *mut u8,
                &mut len,
            )
        };

        if result != 0 {
            return Err(from_code(result, name.to_string()));
        }

        if ty != REG_SZ && ty != REG_EXPAND_SZ {
            return Err(Error::NotAString(name.to_string()));
        }

        buf.truncate(len as usize / 2);
        while buf.last() == Some(&0) {
            buf.pop();
        }

        Ok(String::from_utf16(&buf)?)
    }

    fn delete_value(&self, name: &str) -> Result<(), Error> {
        let wide_name = to_wide(name)?;
        let result = unsafe { RegDeleteValueW(self.handle, wide_name.as_ptr()) };

        if result != 0 {
            return Err(from_code(result, name.to_string()));
        }

        Ok(())
    }

    fn value_names(&self) -> Result<Vec<String>, Error> {
        let mut value_count = 0u32;
        let mut max_name_len = 0u32;

        let result = unsafe {
            RegQueryInfoKeyW(
                self.handle,
                null_mut(),
                null_mut(),
                null_mut(),
                null_mut(),
                null_mut(),
                null_mut(),
                &mut value_count,
                &mut max_name_len,
                null_mut(),
                null_mut(),
                null_mut(),
            )
        };

        if result != 0 {
            return Err(from_code(result, self.path.clone()));
        }

        let mut names = Vec::with_capacity(value_count as usize);
        let mut name_buf = vec![0u16; max_name_len as usize + 1];

        for index in 0..value_count {
            let mut name_len = name_buf.len() as u32;
            let result = unsafe {
                RegEnumValueW(
                    self.handle,
                    index,
                    name_buf.as_mut_ptr(),
                    &mut name_len,
                    null_mut(),
                    null_mut(),
                    null_mut(),
                    null_mut(),
                )
            };

            if result == ERROR_NO_MORE_ITEMS as i32 {
                break;
            }

            if result != 0 {
                return Err(from_code(result, self.path.clone()));
            }

            names.push(String::from_utf16(&name_buf[..name_len as usize])?);
        }

        Ok(names)
    }
}

#[inline]
fn as_hkey(hive: Hive) -> HKEY {
    match hive {
        Hive::CurrentUser => HKEY_CURRENT_USER,
        Hive::LocalMachine => HKEY_LOCAL_MACHINE,
    }
}

fn to_wide(s: &str) -> Result<U16CString, Error> {
    U16CString::from_str(s).map_err(|_| Error::InvalidNul(s.to_string()))
}

#[inline(always)]
fn string_to_utf16_byte_vec(s: &U16CString) -> Vec<u8> {
    s.to_owned()
        .into_vec_with_nul()
        .into_iter()
        .flat_map(|x| x.to_le_bytes().to_vec())
        .collect()
}

fn from_code(code: i32, name: String) -> Error {
    let err = io::Error::from_raw_os_error(code);

    match err.kind() {
        io::ErrorKind::NotFound => Error::NotFound(name, err),
        io::ErrorKind::PermissionDenied => Error::PermissionDenied(name, err),
        _ => Error::Unknown(name, err),
    }
}
