// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The inode: the identity unit shared by hard links. Carries
//! metadata common to every kind, plus a kind-tagged [`Payload`] that
//! a compile-time match keeps consistent with `kind` (spec.md §9's
//! "tagged variant keyed on kind" note).

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, UsageError};
use crate::fs::content::Content;
use crate::perm::Permissions;

/// A stable, filesystem-local identifier for an inode. `0` is always
/// the root directory; every other index is assigned once by
/// [`crate::fs::Filesystem`]'s monotonic allocator and never reused.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct InodeIndex(pub(crate) u64);

impl InodeIndex {
    pub const ROOT: InodeIndex = InodeIndex(0);

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inode's file kind. Distinct from [`crate::header::FileType`]:
/// that one is the codec's on-the-wire nibble (and includes `Socket`/
/// `NamedPipe`, which this in-memory model doesn't materialize since
/// spec.md §3 only lists these five kinds for the filesystem side).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    Directory,
    RegularFile,
    SymbolicLink,
    CharDevice,
    BlockDevice,
}

/// The four timestamps spec.md §3 requires, as seconds since the
/// epoch. Only `modify` round-trips through a CPIO archive (the
/// format has one `mtime` field); the other three are this crate's
/// own bookkeeping and are initialized together at creation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timestamps {
    pub create: u32,
    pub change: u32,
    pub access: u32,
    pub modify: u32,
}

impl Timestamps {
    pub fn at(t: u32) -> Timestamps {
        Timestamps { create: t, change: t, access: t, modify: t }
    }

    pub fn now() -> Timestamps {
        Timestamps::at(now_unix())
    }
}

/// Seconds since the epoch, saturating at `u32::MAX` -- this crate's
/// timestamps share `CpioEntry::mtime`'s width.
pub fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}

/// The kind-specific payload of an inode. Kept private to this module
/// behind accessors on [`Inode`] so `kind` and `payload` can never
/// disagree.
#[derive(Debug)]
pub(crate) enum Payload {
    Directory { children: BTreeMap<String, InodeIndex>, parent: Option<InodeIndex> },
    RegularFile(Content),
    SymbolicLink(String),
    Device { major: u32, minor: u32 },
}

#[derive(Debug)]
pub struct Inode {
    pub(crate) index: InodeIndex,
    pub(crate) kind: Kind,
    pub(crate) mode: Permissions,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) timestamps: Timestamps,
    pub(crate) dev: (u32, u32),
    pub(crate) nlink: u32,
    pub(crate) payload: Payload,
}

impl Inode {
    pub(crate) fn new_directory(index: InodeIndex, parent: Option<InodeIndex>) -> Inode {
        Inode {
            index,
            kind: Kind::Directory,
            mode: Permissions::default_directory(),
            uid: 0,
            gid: 0,
            timestamps: Timestamps::now(),
            dev: (0, 0),
            nlink: 2,
            payload: Payload::Directory { children: BTreeMap::new(), parent },
        }
    }

    pub(crate) fn new_file(index: InodeIndex, content: Content) -> Inode {
        Inode {
            index,
            kind: Kind::RegularFile,
            mode: Permissions::default_file(),
            uid: 0,
            gid: 0,
            timestamps: Timestamps::now(),
            dev: (0, 0),
            nlink: 1,
            payload: Payload::RegularFile(content),
        }
    }

    pub(crate) fn new_symlink(index: InodeIndex, target: String) -> Inode {
        Inode {
            index,
            kind: Kind::SymbolicLink,
            mode: Permissions::from(0o777),
            uid: 0,
            gid: 0,
            timestamps: Timestamps::now(),
            dev: (0, 0),
            nlink: 1,
            payload: Payload::SymbolicLink(target),
        }
    }

    pub(crate) fn new_device(
        index: InodeIndex,
        kind: Kind,
        major: u32,
        minor: u32,
    ) -> Inode {
        debug_assert!(matches!(kind, Kind::CharDevice | Kind::BlockDevice));
        Inode {
            index,
            kind,
            mode: Permissions::from(0o660),
            uid: 0,
            gid: 0,
            timestamps: Timestamps::now(),
            dev: (0, 0),
            nlink: 1,
            payload: Payload::Device { major, minor },
        }
    }

    pub fn index(&self) -> InodeIndex {
        self.index
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn mode(&self) -> Permissions {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Permissions) {
        self.mode = mode;
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn set_uid(&mut self, uid: u32) {
        self.uid = uid;
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn set_gid(&mut self, gid: u32) {
        self.gid = gid;
    }

    pub fn timestamps(&self) -> Timestamps {
        self.timestamps
    }

    pub fn set_timestamps(&mut self, t: Timestamps) {
        self.timestamps = t;
    }

    pub fn dev(&self) -> (u32, u32) {
        self.dev
    }

    pub fn set_dev(&mut self, dev: (u32, u32)) {
        self.dev = dev;
    }

    pub fn nlink(&self) -> u32 {
        self.nlink
    }

    /// Adjusts `nlink` by `delta`, which may be negative. Used instead
    /// of exposing a raw setter so every adjustment site reads as
    /// "add a reference" / "drop a reference".
    pub(crate) fn bump_nlink(&mut self, delta: i32) {
        self.nlink = (self.nlink as i64 + delta as i64) as u32;
    }

    /// Copies ownership/permission/timestamp/device metadata from
    /// `other` onto `self`. Used by [`crate::fs::Filesystem`]'s copy
    /// operations, which build a fresh inode of the right kind and
    /// then stamp the source's metadata onto it.
    pub(crate) fn copy_ownership_from(&mut self, other: &Inode) {
        self.mode = other.mode;
        self.uid = other.uid;
        self.gid = other.gid;
        self.timestamps = other.timestamps;
        self.dev = other.dev;
    }

    /// Produces an independent copy of this inode's content, suitable
    /// for attaching to a newly allocated inode. `Bytes`/`Utf8` clone
    /// directly; a `Reader` or `Deferred` source is materialized once
    /// and then replaces `self`'s own content with the materialized
    /// bytes, so both the original and the copy end up holding the
    /// same buffer without reading a stream twice.
    pub(crate) fn duplicate_content(&mut self) -> Result<Content, Error> {
        let existing = match &mut self.payload {
            Payload::RegularFile(c) => c,
            _ => return Err(UsageError::WrongType("not a regular file").into()),
        };
        match existing {
            Content::Bytes(b) => Ok(Content::Bytes(b.clone())),
            Content::Utf8(s) => Ok(Content::Utf8(s.clone())),
            Content::Reader(..) | Content::Deferred(_) => {
                let taken = std::mem::replace(existing, Content::Bytes(Vec::new()));
                let bytes = taken.materialize()?;
                *existing = Content::Bytes(bytes.clone());
                Ok(Content::Bytes(bytes))
            }
        }
    }

    pub(crate) fn children(&self) -> Result<&BTreeMap<String, InodeIndex>, Error> {
        match &self.payload {
            Payload::Directory { children, .. } => Ok(children),
            _ => Err(UsageError::NotADirectory(self.index.to_string()).into()),
        }
    }

    pub(crate) fn children_mut(&mut self) -> Result<&mut BTreeMap<String, InodeIndex>, Error> {
        match &mut self.payload {
            Payload::Directory { children, .. } => Ok(children),
            _ => Err(UsageError::NotADirectory(self.index.to_string()).into()),
        }
    }

    pub(crate) fn parent_index(&self) -> Option<InodeIndex> {
        match &self.payload {
            Payload::Directory { parent, .. } => *parent,
            _ => None,
        }
    }

    pub(crate) fn set_parent_index(&mut self, new_parent: Option<InodeIndex>) {
        if let Payload::Directory { parent, .. } = &mut self.payload {
            *parent = new_parent;
        }
    }

    pub fn symlink_target(&self) -> Option<&str> {
        match &self.payload {
            Payload::SymbolicLink(target) => Some(target),
            _ => None,
        }
    }

    pub fn device(&self) -> Option<(u32, u32)> {
        match &self.payload {
            Payload::Device { major, minor } => Some((*major, *minor)),
            _ => None,
        }
    }

    /// The stored content of a regular-file inode, or `None` for every
    /// other kind.
    pub fn content(&self) -> Option<&Content> {
        match &self.payload {
            Payload::RegularFile(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn content_mut(&mut self) -> Option<&mut Content> {
        match &mut self.payload {
            Payload::RegularFile(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn set_content(&mut self, content: Content) {
        if let Payload::RegularFile(c) = &mut self.payload {
            *c = content;
        }
    }

    pub(crate) fn set_symlink_target(&mut self, target: String) {
        if let Payload::SymbolicLink(t) = &mut self.payload {
            *t = target;
        }
    }
}
