// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The codec-facing entry record: everything a [`RawHeader`] carries,
//! plus the decoded name and (for symbolic links) decoded link target.
//! This is the unit the reader yields and the writer accepts; it knows
//! nothing about the archive's position in the stream or its body
//! bytes, which the reader/writer handle separately.

use crate::error::{Error, UsageError};
use crate::header::{self, FileType, HeaderKind, Mode, RawHeader};
use crate::path;

/// One CPIO entry's metadata, independent of its (possibly still
/// unread) body.
#[derive(Clone, Debug, PartialEq)]
pub struct CpioEntry {
    pub kind: HeaderKind,
    /// The archive's own inode number, used to group hard links
    /// within this archive. Unrelated to any filesystem inode index.
    pub inode_number: u32,
    pub file_type: FileType,
    /// The low 9 permission bits of `mode`; the file-type nibble
    /// lives in `file_type` instead.
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    /// Body length in bytes: the file size for regular files, the
    /// UTF-8 length of the link target for symbolic links, else 0.
    pub length: u64,
    pub dev: (u32, u32),
    pub rdev: (u32, u32),
    pub checksum: u32,
    pub name: String,
    pub link_name: Option<String>,
}

impl CpioEntry {
    pub fn is_trailer(&self) -> bool {
        self.name == header::TRAILER_NAME
    }

    pub(crate) fn from_raw(raw: &RawHeader, name: String, link_name: Option<String>) -> CpioEntry {
        CpioEntry {
            kind: raw.kind,
            inode_number: raw.ino,
            file_type: raw.mode.file_type(),
            mode: raw.mode.permissions() as u16,
            uid: raw.uid,
            gid: raw.gid,
            nlink: raw.nlink,
            mtime: raw.mtime,
            length: raw.filesize as u64,
            dev: (raw.devmajor, raw.devminor),
            rdev: (raw.rdevmajor, raw.rdevminor),
            checksum: raw.check,
            name,
            link_name,
        }
    }

    pub(crate) fn to_raw(&self, namesize: u32, filesize: u32) -> RawHeader {
        RawHeader {
            kind: self.kind,
            ino: self.inode_number,
            mode: Mode((self.mode as u32 & 0x1FF) | header::file_type_nibble(self.file_type)),
            uid: self.uid,
            gid: self.gid,
            nlink: self.nlink,
            mtime: self.mtime,
            filesize,
            devmajor: self.dev.0,
            devminor: self.dev.1,
            rdevmajor: self.rdev.0,
            rdevminor: self.rdev.1,
            namesize,
            check: self.checksum,
        }
    }

    /// Validates this entry against §4.6's writer-side rules: name
    /// shape, and the per-file-type agreement between `file_type`,
    /// `nlink`, `link_name`, and whether a body is being supplied.
    /// `has_data` is whether the caller is supplying a nonempty body
    /// alongside this entry.
    pub(crate) fn validate_for_write(&self, has_data: bool) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(UsageError::EmptyName.into());
        }
        path::validate(&self.name)?;
        if self.name.starts_with("..") {
            return Err(UsageError::InvalidName.into());
        }
        if path::normalize(&self.name) != self.name {
            return Err(UsageError::InvalidName.into());
        }

        match self.file_type {
            FileType::SymbolicLink => {
                if self.link_name.as_deref().is_none_or(str::is_empty) {
                    return Err(UsageError::EmptySymlinkTarget.into());
                }
                if self.nlink != 1 {
                    return Err(UsageError::Other("symbolic links must have nlink == 1").into());
                }
            }
            FileType::RegularFile => {
                if self.link_name.is_some() {
                    return Err(
                        UsageError::Other("regular files must not carry a link target").into()
                    );
                }
                if has_data != (self.length > 0) {
                    return Err(UsageError::Other(
                        "data presence disagrees with declared length",
                    )
                    .into());
                }
            }
            FileType::Directory => {
                if self.nlink < 2 {
                    return Err(UsageError::Other("directories must have nlink >= 2").into());
                }
                if has_data || self.length != 0 {
                    return Err(UsageError::Other("directories must not carry a body").into());
                }
            }
            FileType::NamedPipe | FileType::CharDevice | FileType::BlockDevice | FileType::Socket => {
                if self.nlink != 1 {
                    return Err(UsageError::Other("this file type must have nlink == 1").into());
                }
                if has_data || self.length != 0 {
                    return Err(UsageError::Other("this file type must not carry a body").into());
                }
                if self.link_name.is_some() {
                    return Err(
                        UsageError::Other("only symbolic links carry a link target").into()
                    );
                }
            }
            FileType::Unknown(_) => {
                return Err(UsageError::WrongType("unsupported file type").into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderKind;

    fn base(file_type: FileType) -> CpioEntry {
        CpioEntry {
            kind: HeaderKind::NewAscii,
            inode_number: 1,
            file_type,
            mode: 0o644,
            uid: 0,
            gid: 0,
            nlink: 1,
            mtime: 0,
            length: 0,
            dev: (0, 0),
            rdev: (0, 0),
            checksum: 0,
            name: "file.txt".to_string(),
            link_name: None,
        }
    }

    #[test]
    fn raw_round_trip_preserves_mode_and_type() {
        let e = base(FileType::RegularFile);
        let raw = e.to_raw(9, 0);
        let back = CpioEntry::from_raw(&raw, e.name.clone(), None);
        assert_eq!(back.mode, e.mode);
        assert_eq!(back.file_type, e.file_type);
        assert_eq!(back.inode_number, e.inode_number);
    }

    #[test]
    fn rejects_relative_escape_name() {
        let mut e = base(FileType::RegularFile);
        e.name = "../etc/passwd".to_string();
        assert!(e.validate_for_write(false).is_err());
    }

    #[test]
    fn rejects_non_normalized_name() {
        let mut e = base(FileType::RegularFile);
        e.name = "a/./b".to_string();
        assert!(e.validate_for_write(false).is_err());
    }

    #[test]
    fn symlink_requires_target_and_single_link() {
        let mut e = base(FileType::SymbolicLink);
        assert!(e.validate_for_write(false).is_err());
        e.link_name = Some("target".to_string());
        assert!(e.validate_for_write(false).is_ok());
        e.nlink = 2;
        assert!(e.validate_for_write(false).is_err());
    }

    #[test]
    fn regular_file_requires_data_matching_length() {
        let mut e = base(FileType::RegularFile);
        e.length = 5;
        assert!(e.validate_for_write(false).is_err());
        assert!(e.validate_for_write(true).is_ok());
        e.length = 0;
        assert!(e.validate_for_write(true).is_err());
    }

    #[test]
    fn directory_requires_nlink_at_least_two() {
        let mut e = base(FileType::Directory);
        e.nlink = 1;
        assert!(e.validate_for_write(false).is_err());
        e.nlink = 2;
        assert!(e.validate_for_write(false).is_ok());
    }

    #[test]
    fn device_rejects_body_and_link_target() {
        let mut e = base(FileType::BlockDevice);
        assert!(e.validate_for_write(false).is_ok());
        e.length = 1;
        assert!(e.validate_for_write(true).is_err());
    }
}
