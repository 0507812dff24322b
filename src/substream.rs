// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A read-only window `[start, start+len)` over a parent byte stream.
//!
//! Two parent shapes are supported, wrapped explicitly rather than
//! detected: [`Sequential`] for streams that can only be consumed in
//! order, and [`Seekable`] for streams that additionally implement
//! [`Seek`]. [`SubStream`] is generic over the [`Source`] trait both
//! implement, so the reader and writer don't need to care which one
//! they were handed.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, StateError};

/// A byte source a [`SubStream`] can be built over. Implemented by
/// [`Sequential`] (no random access) and [`Seekable`] (backed by a
/// type that implements [`Seek`]).
pub trait Source: Read {
    /// Seeks to an absolute offset in the parent's coordinate space,
    /// or `None` if this source doesn't support seeking.
    fn try_seek(&mut self, offset: u64) -> Option<io::Result<()>>;

    /// The parent's current absolute position, or `None` if unknown.
    /// Used to detect a seekable parent whose cursor drifted between
    /// substream reads (another consumer of the same underlying file,
    /// for instance).
    fn position(&mut self) -> Option<io::Result<u64>> {
        None
    }
}

/// Wraps a non-seekable byte source.
pub struct Sequential<R>(pub R);

impl<R: Read> Read for Sequential<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read> Source for Sequential<R> {
    fn try_seek(&mut self, _offset: u64) -> Option<io::Result<()>> {
        None
    }
}

/// Wraps a seekable byte source.
pub struct Seekable<R>(pub R);

impl<R: Read> Read for Seekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read + Seek> Source for Seekable<R> {
    fn try_seek(&mut self, offset: u64) -> Option<io::Result<()>> {
        Some(self.0.seek(SeekFrom::Start(offset)).map(|_| ()))
    }

    fn position(&mut self) -> Option<io::Result<u64>> {
        Some(self.0.stream_position())
    }
}

/// A bounded, read-only view over `parent`'s bytes in
/// `[start, start + len)`. Writes are not supported; once the window
/// is exhausted, reads return `Ok(0)` exactly once more (the latched
/// "end" observation), then raise [`StateError::UnconsumedBody`]-style
/// data errors on any further attempt to pull bytes, since that
/// indicates the caller ignored the first EOF.
pub struct SubStream<'p, S: Source> {
    parent: &'p mut S,
    start: u64,
    len: u64,
    pos: u64,
    ended: bool,
}

impl<'p, S: Source> SubStream<'p, S> {
    pub fn new(parent: &'p mut S, start: u64, len: u64) -> SubStream<'p, S> {
        SubStream { parent, start, len, pos: 0, ended: false }
    }

    /// Total length of this window, in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes remaining, relative to the current position.
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Current position, relative to the start of the window.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Sets the current position within `[0, len]`. Only meaningful
    /// when the parent is seekable; non-seekable parents cannot
    /// honour an out-of-order position and the next `read` will fail.
    pub fn set_position(&mut self, pos: u64) -> Result<(), Error> {
        if pos > self.len {
            return Err(
                io::Error::new(io::ErrorKind::InvalidInput, "position past end of substream").into(),
            );
        }
        self.pos = pos;
        self.ended = false;
        Ok(())
    }

    /// Reads and discards whatever of this window has not yet been
    /// consumed, leaving the parent positioned just past the window
    /// (rounded to the window's own end, alignment padding is the
    /// caller's concern).
    pub fn drain(&mut self) -> Result<(), Error> {
        let mut buf = [0u8; 4096];
        loop {
            let n = self.read_some(&mut buf)?;
            if n == 0 {
                break;
            }
        }
        Ok(())
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.pos >= self.len {
            if self.ended {
                return Err(Error::State(StateError::UnconsumedBody));
            }
            self.ended = true;
            return Ok(0);
        }
        if let Some(actual) = self.parent.position() {
            let actual = actual?;
            let expected = self.start + self.pos;
            if actual != expected {
                if let Some(result) = self.parent.try_seek(expected) {
                    result?;
                }
            }
        }
        let want = (self.len - self.pos).min(buf.len() as u64) as usize;
        let n = self.parent.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: Source> Read for SubStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_some(buf).map_err(|e| match e {
            Error::Io(io_err) => io_err,
            other => io::Error::new(io::ErrorKind::Other, other),
        })
    }
}
