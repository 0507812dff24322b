// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The regular-file content sum type spec.md §6 names as an external
//! collaborator ("bytes/string/stream/deferred producer") but leaves
//! unspecified. Nothing upstream supplies this crate with one, so it
//! lives here: a small value type a caller builds from whichever shape
//! is convenient and the writer drains through [`Content::copy_to`].

use std::io::{self, Read, Write};

/// File content supplied to [`crate::fs::Filesystem::create_file`] or
/// already stored in a [`RegularFile`](crate::fs::inode::Kind::RegularFile)
/// inode. `Reader` and `Deferred` are resolved to an in-memory buffer
/// the first time their length or bytes are needed -- the newc format
/// requires `filesize` before any body byte is written, so a streamed
/// source can't be written lazily the way the bounded sub-stream reads
/// one.
pub enum Content {
    Bytes(Vec<u8>),
    /// UTF-8 text, encoded to bytes only when written out.
    Utf8(String),
    /// A boxed reader paired with its known length.
    Reader(Box<dyn Read>, u64),
    /// A producer invoked once, on first use.
    Deferred(Box<dyn FnOnce() -> io::Result<Content>>),
}

impl Content {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Content {
        Content::Bytes(bytes.into())
    }

    pub fn from_str(s: impl Into<String>) -> Content {
        Content::Utf8(s.into())
    }

    /// Collapses `Deferred` producers (recursively, in case a producer
    /// itself returns another `Deferred`) into a directly-usable
    /// variant. A no-op for every other variant.
    pub fn resolve(self) -> io::Result<Content> {
        match self {
            Content::Deferred(f) => f()?.resolve(),
            other => Ok(other),
        }
    }

    /// The content's length in bytes. Requires a resolved value (see
    /// [`Content::resolve`]); panics on an unresolved `Deferred`,
    /// matching this crate's "never silently materialize at a
    /// surprising time" stance -- callers that build entries always
    /// resolve first.
    pub fn len(&self) -> u64 {
        match self {
            Content::Bytes(b) => b.len() as u64,
            Content::Utf8(s) => s.len() as u64,
            Content::Reader(_, len) => *len,
            Content::Deferred(_) => {
                panic!("Content::len called on an unresolved Deferred value")
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the full content to `sink`, returning the number of
    /// bytes written. Consumes `self` since a `Reader` can only be
    /// drained once.
    pub fn copy_to(self, sink: &mut dyn Write) -> io::Result<u64> {
        match self {
            Content::Bytes(b) => {
                sink.write_all(&b)?;
                Ok(b.len() as u64)
            }
            Content::Utf8(s) => {
                sink.write_all(s.as_bytes())?;
                Ok(s.len() as u64)
            }
            Content::Reader(mut r, len) => {
                let n = io::copy(&mut r, sink)?;
                Ok(n.min(len))
            }
            Content::Deferred(f) => f()?.copy_to(sink),
        }
    }

    /// Materializes this content into an owned, cheaply-cloneable
    /// buffer. `Copy` operations (§4.7) that deep-copy a regular
    /// file's body call this rather than attempting to clone a
    /// `Reader`, which `Box<dyn Read>` cannot do; this is the "deep-
    /// copy byte buffers" half of spec.md §6's cloning contract.
    pub fn materialize(self) -> io::Result<Vec<u8>> {
        match self.resolve()? {
            Content::Bytes(b) => Ok(b),
            Content::Utf8(s) => Ok(s.into_bytes()),
            Content::Reader(mut r, len) => {
                let mut buf = Vec::with_capacity(len as usize);
                r.read_to_end(&mut buf)?;
                Ok(buf)
            }
            Content::Deferred(_) => unreachable!("resolve() strips Deferred"),
        }
    }
}

impl Clone for Content {
    /// Only the materialized variants are actually cheap to clone;
    /// `Reader` and `Deferred` are read once elsewhere in this crate
    /// (via [`materialize`](Self::materialize)) before a clone is ever
    /// requested, so reaching this arm is a caller bug.
    fn clone(&self) -> Content {
        match self {
            Content::Bytes(b) => Content::Bytes(b.clone()),
            Content::Utf8(s) => Content::Utf8(s.clone()),
            Content::Reader(..) | Content::Deferred(_) => {
                panic!("Content::clone called on a stream-backed or deferred value")
            }
        }
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Content::Utf8(s) => f.debug_tuple("Utf8").field(&s.len()).finish(),
            Content::Reader(_, len) => f.debug_tuple("Reader").field(len).finish(),
            Content::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        let c = Content::from_bytes(b"hello".to_vec());
        let mut out = Vec::new();
        let n = c.copy_to(&mut out).unwrap();
        assert_eq!(n, 5);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn deferred_resolves_once() {
        let c = Content::Deferred(Box::new(|| Ok(Content::from_str("late"))));
        let resolved = c.resolve().unwrap();
        assert_eq!(resolved.len(), 4);
    }

    #[test]
    fn reader_materializes_to_bytes() {
        let data: &[u8] = b"stream me";
        let c = Content::Reader(Box::new(data), data.len() as u64);
        let bytes = c.materialize().unwrap();
        assert_eq!(bytes, b"stream me");
    }
}
