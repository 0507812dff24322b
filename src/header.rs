// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The raw, fixed-size newc header: 6-byte magic followed by thirteen
//! 8-digit uppercase-hex fields. This module only knows about those
//! 110 bytes; entry names, bodies, and padding are the reader/writer's
//! concern.

use bitstruct::bitstruct;
use static_assertions::const_assert_eq;

use crate::error::{DataErrorKind, Error};
use crate::hex;

pub const MAGIC_NEWC: [u8; 6] = *b"070701";
pub const MAGIC_NEWC_CHECKSUM: [u8; 6] = *b"070702";
pub const HEADER_LEN: usize = 110;
pub const TRAILER_NAME: &str = "TRAILER!!!";
/// `TRAILER_NAME` including its NUL terminator, padded to a 4-byte
/// boundary: 110 (header) + 11 (name+NUL) + 3 (pad) = 124.
pub const TRAILER_LEN: usize = 124;

const_assert_eq!(HEADER_LEN, 6 + 13 * 8);
const_assert_eq!(TRAILER_LEN, HEADER_LEN + 11 + 3);

/// Which magic this header used. The checksum variant is accepted on
/// read and preserved on round-trip; this crate never computes or
/// validates the `check` field's content, matching cpio's own
/// practice of treating it as opaque metadata for most consumers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HeaderKind {
    NewAscii,
    NewAsciiChecksum,
}

impl HeaderKind {
    fn magic(self) -> [u8; 6] {
        match self {
            HeaderKind::NewAscii => MAGIC_NEWC,
            HeaderKind::NewAsciiChecksum => MAGIC_NEWC_CHECKSUM,
        }
    }
}

/// The file-type nibble occupying bits 12..=15 of `mode`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileType {
    NamedPipe,
    CharDevice,
    Directory,
    BlockDevice,
    RegularFile,
    SymbolicLink,
    Socket,
    /// A nibble value this crate doesn't recognize. Carried rather
    /// than rejected at the bit-unpacking layer so the reader can
    /// raise a `DataError` at the right byte offset instead of a
    /// panic deep inside bit twiddling.
    Unknown(u8),
}

impl bitstruct::FromRaw<u8, FileType> for Mode {
    fn from_raw(raw: u8) -> FileType {
        match raw {
            0x1 => FileType::NamedPipe,
            0x2 => FileType::CharDevice,
            0x4 => FileType::Directory,
            0x6 => FileType::BlockDevice,
            0x8 => FileType::RegularFile,
            0xA => FileType::SymbolicLink,
            0xC => FileType::Socket,
            other => FileType::Unknown(other),
        }
    }
}

impl bitstruct::IntoRaw<u8, FileType> for Mode {
    fn into_raw(bits: FileType) -> u8 {
        match bits {
            FileType::NamedPipe => 0x1,
            FileType::CharDevice => 0x2,
            FileType::Directory => 0x4,
            FileType::BlockDevice => 0x6,
            FileType::RegularFile => 0x8,
            FileType::SymbolicLink => 0xA,
            FileType::Socket => 0xC,
            FileType::Unknown(raw) => raw,
        }
    }
}

bitstruct! {
    /// The packed `mode` field: a 9-bit permission mask in the low
    /// bits and the file-type nibble in bits 12..=15. Bits 9..=11
    /// (setuid/setgid/sticky in traditional usage) are preserved
    /// verbatim but not otherwise interpreted by this crate.
    #[derive(Clone, Copy, Debug)]
    pub struct Mode(u32) {
        pub permissions: u32 = 0..=8;
        pub extra_bits: u32 = 9..=11;
        pub file_type: FileType = 12..=15;
    }
}

/// The raw nibble a given [`FileType`] packs into, as a `mode`-sized
/// `u32` already shifted into bits 12..=15.
pub(crate) fn file_type_nibble(ft: FileType) -> u32 {
    (<Mode as bitstruct::IntoRaw<u8, FileType>>::into_raw(ft) as u32) << 12
}

/// The parsed contents of one 110-byte newc header, still in terms of
/// raw integer fields -- no UTF-8 decoding, no padding, no body.
#[derive(Clone, Debug)]
pub struct RawHeader {
    pub kind: HeaderKind,
    pub ino: u32,
    pub mode: Mode,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub filesize: u32,
    pub devmajor: u32,
    pub devminor: u32,
    pub rdevmajor: u32,
    pub rdevminor: u32,
    pub namesize: u32,
    pub check: u32,
}

impl RawHeader {
    /// Parses a 110-byte header at archive byte offset `offset` (used
    /// only to annotate errors with where the fault is).
    pub fn parse(buf: &[u8; HEADER_LEN], offset: u64) -> Result<RawHeader, Error> {
        let kind = if buf[0..6] == MAGIC_NEWC {
            HeaderKind::NewAscii
        } else if buf[0..6] == MAGIC_NEWC_CHECKSUM {
            HeaderKind::NewAsciiChecksum
        } else {
            return Err(Error::data(DataErrorKind::BadMagic, offset));
        };

        // The 13 hex fields are processed 2-at-a-time through the
        // vectorised 16-byte path where they fall on an even boundary,
        // and singly for the trailing odd one (`check`).
        let fields = &buf[6..];
        let pair = |lo: usize| -> Result<(u32, u32), Error> {
            let chunk: &[u8; 16] = fields[lo..lo + 16].try_into().unwrap();
            let (packed, ok) = hex::parse_u64_hex(chunk);
            if !ok {
                return Err(Error::data(DataErrorKind::InvalidHex, offset + 6 + lo as u64));
            }
            Ok(((packed >> 32) as u32, packed as u32))
        };
        let single = |lo: usize| -> Result<u32, Error> {
            let chunk: &[u8; 8] = fields[lo..lo + 8].try_into().unwrap();
            let (v, ok) = hex::parse_u32_hex(chunk);
            if !ok {
                return Err(Error::data(DataErrorKind::InvalidHex, offset + 6 + lo as u64));
            }
            Ok(v)
        };

        let (ino, raw_mode) = pair(0)?;
        let (uid, gid) = pair(16)?;
        let (nlink, mtime) = pair(32)?;
        let (filesize, devmajor) = pair(48)?;
        let (devminor, rdevmajor) = pair(64)?;
        let (rdevminor, namesize) = pair(80)?;
        let check = single(96)?;

        Ok(RawHeader {
            kind,
            ino,
            mode: Mode(raw_mode),
            uid,
            gid,
            nlink,
            mtime,
            filesize,
            devmajor,
            devminor,
            rdevmajor,
            rdevminor,
            namesize,
            check,
        })
    }

    /// Serializes this header back to its 110-byte wire form.
    pub fn format(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..6].copy_from_slice(&self.kind.magic());
        let fields: [u32; 13] = [
            self.ino,
            self.mode.0,
            self.uid,
            self.gid,
            self.nlink,
            self.mtime,
            self.filesize,
            self.devmajor,
            self.devminor,
            self.rdevmajor,
            self.rdevminor,
            self.namesize,
            self.check,
        ];
        for (i, field) in fields.iter().enumerate() {
            let off = 6 + i * 8;
            out[off..off + 8].copy_from_slice(&hex::format_u32(*field));
        }
        out
    }
}
