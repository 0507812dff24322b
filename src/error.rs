// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The three error kinds this crate can raise: bad caller input
//! (`Usage`), a malformed archive stream (`Data`), and use of a reader
//! or writer past its valid lifetime (`State`). See each variant's
//! doc comment for the recovery story.

use std::io;

/// Argument validation failures: null/empty/non-normalized names,
/// invalid path characters, wrong file type for the requested
/// operation, a duplicate name at attach time, deleting the root, and
/// so on. Recovery: the caller corrects its inputs and retries.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum UsageError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("name must not contain '/' or NUL")]
    InvalidName,
    #[error("path must not contain NUL")]
    InvalidPath,
    #[error("path has more than 2048 components")]
    PathTooDeep,
    #[error("no such entry: {0}")]
    NotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("entry already exists: {0}")]
    AlreadyExists(String),
    #[error("wrong file type for operation: {0}")]
    WrongType(&'static str),
    #[error("the root directory cannot be deleted")]
    CannotDeleteRoot,
    #[error("hard links to directories are not supported")]
    HardLinkToDirectory,
    #[error("symbolic link target must not be empty")]
    EmptySymlinkTarget,
    #[error("{0}")]
    Other(&'static str),
}

/// The kind of malformed-archive condition that produced a
/// [`Error::Data`]. Recovery: none, the stream is abandoned.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DataErrorKind {
    #[error("bad magic number in cpio header")]
    BadMagic,
    #[error("header field is not valid ASCII hex")]
    InvalidHex,
    #[error("name size field was zero")]
    ZeroNameSize,
    #[error("entry name is not valid UTF-8")]
    InvalidNameEncoding,
    #[error("symlink target is not valid UTF-8")]
    InvalidLinkTargetEncoding,
    #[error("non-file, non-symlink entry has a nonzero body")]
    UnexpectedBody,
    #[error("trailer record has a nonzero body")]
    TrailerHasBody,
    #[error("archive ended before the entry body was fully read")]
    TruncatedBody,
    #[error("archive ended before the entry name was fully read")]
    TruncatedName,
    #[error("archive ended before a header was fully read")]
    TruncatedHeader,
    #[error("unsupported file type in mode nibble")]
    UnsupportedFileType,
    #[error("hard-linked entry's payload disagrees with the first occurrence")]
    InconsistentHardLinkPayload,
}

/// Reader/writer misuse that can only be detected at run time: asking
/// a reader for the next entry before a non-seekable stream's current
/// body was fully consumed, or using a reader/writer/filesystem after
/// it has been disposed. Recovery: none, the object is poisoned.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("previous entry's body was not fully consumed on a non-seekable stream")]
    UnconsumedBody,
    #[error("operation attempted after dispose")]
    Disposed,
}

/// The crate-wide error type. Every fallible operation in this crate
/// returns `Result<T>` built on this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error("data error at byte offset {offset}: {kind}")]
    Data { kind: DataErrorKind, offset: u64 },
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn data(kind: DataErrorKind, offset: u64) -> Error {
        Error::Data { kind, offset }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
