// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! POSIX permission bits, as a typed view over the low 9 bits of an
//! inode's `mode`. Mirrors the teacher's own use of `bitflags!` for a
//! packed-bits field (see the superblock `Flags` in its UFS reader)
//! rather than leaving callers to poke at a bare integer.

use bitflags::bitflags;

bitflags! {
    /// The 9 permission bits spec.md's data model calls out separately
    /// from the file-type nibble. Values match the traditional octal
    /// layout (`0o400` = owner read, ..., `0o001` = other execute).
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Permissions: u16 {
        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXEC = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC = 0o010;
        const OTHER_READ = 0o004;
        const OTHER_WRITE = 0o002;
        const OTHER_EXEC = 0o001;
    }
}

impl Permissions {
    /// The default permission bits this crate assigns a freshly
    /// created directory: `rwxr-xr-x`.
    pub fn default_directory() -> Permissions {
        Permissions::from_bits_truncate(0o755)
    }

    /// The default permission bits for a freshly created regular
    /// file: `rw-r--r--`.
    pub fn default_file() -> Permissions {
        Permissions::from_bits_truncate(0o644)
    }
}

impl From<u16> for Permissions {
    fn from(bits: u16) -> Permissions {
        Permissions::from_bits_truncate(bits & 0o777)
    }
}

impl From<Permissions> for u16 {
    fn from(p: Permissions) -> u16 {
        p.bits()
    }
}
