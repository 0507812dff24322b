// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Streaming newc reader: `ReadHeader -> ReadName -> ReadBody -> loop`,
//! `Done` on `TRAILER!!!`. One reader is good for one pass over one
//! archive; it does not support random access.

use std::io::{self, Read};

use crate::entry::CpioEntry;
use crate::error::{DataErrorKind, Error, StateError, UsageError};
use crate::header::{self, FileType, RawHeader};
use crate::substream::{Source, SubStream};

/// Reader behaviour that doesn't affect wire format.
#[derive(Clone, Copy, Debug)]
pub struct ReaderOptions {
    /// If `false`, the caller intends to reclaim the underlying source
    /// via [`CpioReader::into_inner`] rather than let it drop with the
    /// reader. Purely documentation -- see that method.
    pub close_on_drop: bool,
}

impl Default for ReaderOptions {
    fn default() -> ReaderOptions {
        ReaderOptions { close_on_drop: true }
    }
}

fn align4_pad(len: u64) -> u64 {
    (4 - (len % 4)) % 4
}

struct PendingBody {
    /// Archive-relative offset (bytes since this reader's first byte)
    /// where the body begins.
    start: u64,
    len: u64,
    pos: u64,
    pad: u64,
}

/// A streaming newc reader over `S`. Call [`next_entry`](Self::next_entry)
/// repeatedly; it returns `Ok(None)` once the trailer has been
/// consumed. A regular file's body is not read by `next_entry` itself
/// -- fetch it with [`body`](Self::body) before calling `next_entry`
/// again; any unread remainder is skipped (or, on a non-seekable
/// source, rejected as a usage error) automatically.
pub struct CpioReader<S: Source> {
    source: S,
    /// The source's absolute position when this reader was created, if
    /// it supports `position()`. Used only to translate this reader's
    /// archive-relative offsets into absolute seeks.
    origin: u64,
    pos: u64,
    pending: Option<PendingBody>,
    done: bool,
    options: ReaderOptions,
}

impl<S: Source> CpioReader<S> {
    pub fn new(source: S) -> Result<CpioReader<S>, Error> {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(mut source: S, options: ReaderOptions) -> Result<CpioReader<S>, Error> {
        let origin = match source.position() {
            Some(p) => p?,
            None => 0,
        };
        Ok(CpioReader { source, origin, pos: 0, pending: None, done: false, options })
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    /// Reclaims the underlying source. Intended for callers that
    /// constructed this reader with `close_on_drop: false`.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Reads the next entry's metadata. Returns `Ok(None)` once the
    /// trailer record has been consumed; the reader must not be used
    /// again afterwards.
    pub fn next_entry(&mut self) -> Result<Option<CpioEntry>, Error> {
        if self.done {
            return Err(StateError::Disposed.into());
        }
        self.finish_pending()?;

        let mut hdr_buf = [0u8; header::HEADER_LEN];
        self.read_exact_mapped(&mut hdr_buf, DataErrorKind::TruncatedHeader)?;
        let header_offset = self.pos;
        self.pos += header::HEADER_LEN as u64;
        let raw = RawHeader::parse(&hdr_buf, header_offset)?;

        if raw.namesize == 0 {
            return Err(Error::data(DataErrorKind::ZeroNameSize, self.pos));
        }
        let mut name_buf = vec![0u8; raw.namesize as usize];
        self.read_exact_mapped(&mut name_buf, DataErrorKind::TruncatedName)?;
        self.pos += raw.namesize as u64;

        if name_buf.pop() != Some(0) {
            return Err(Error::data(DataErrorKind::InvalidNameEncoding, self.pos));
        }
        let name = String::from_utf8(name_buf)
            .map_err(|_| Error::data(DataErrorKind::InvalidNameEncoding, self.pos))?;
        self.skip(align4_pad(self.pos))?;

        if name == header::TRAILER_NAME {
            if raw.filesize != 0 {
                return Err(Error::data(DataErrorKind::TrailerHasBody, self.pos));
            }
            tracing::debug!(offset = header_offset, "read trailer");
            self.done = true;
            return Ok(None);
        }

        let file_type = raw.mode.file_type();
        let link_name = match file_type {
            FileType::SymbolicLink => {
                let mut buf = vec![0u8; raw.filesize as usize];
                self.read_exact_mapped(&mut buf, DataErrorKind::TruncatedBody)?;
                self.pos += raw.filesize as u64;
                let target = String::from_utf8(buf)
                    .map_err(|_| Error::data(DataErrorKind::InvalidLinkTargetEncoding, self.pos))?;
                if target.is_empty() {
                    return Err(UsageError::EmptySymlinkTarget.into());
                }
                self.skip(align4_pad(self.pos))?;
                Some(target)
            }
            FileType::RegularFile => {
                let pad = align4_pad(self.pos + raw.filesize as u64);
                self.pending = Some(PendingBody {
                    start: self.pos,
                    len: raw.filesize as u64,
                    pos: 0,
                    pad,
                });
                None
            }
            FileType::Unknown(_) => {
                return Err(Error::data(DataErrorKind::UnsupportedFileType, self.pos));
            }
            _ => {
                if raw.filesize != 0 {
                    return Err(Error::data(DataErrorKind::UnexpectedBody, self.pos));
                }
                None
            }
        };

        let entry = CpioEntry::from_raw(&raw, name, link_name);
        tracing::trace!(name = %entry.name, ino = entry.inode_number, kind = ?entry.file_type, "read entry");
        Ok(Some(entry))
    }

    /// Borrows the body of the entry most recently returned by
    /// `next_entry`, if it has a deferred body (regular files only).
    /// Returns `None` for every other entry kind, or once the body has
    /// already been fully consumed.
    pub fn body(&mut self) -> Option<BodyReader<'_, S>> {
        self.pending.as_ref()?;
        Some(BodyReader { reader: self })
    }

    fn finish_pending(&mut self) -> Result<(), Error> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let remaining = pending.len - pending.pos;
        let seekable = self.source.position().is_some();
        if !seekable && remaining + pending.pad > 3 {
            self.pending = None;
            return Err(StateError::UnconsumedBody.into());
        }
        if remaining > 0 {
            let mut sub = SubStream::new(&mut self.source, self.origin + pending.start, pending.len);
            sub.set_position(pending.pos)?;
            sub.drain()?;
        }
        self.skip(pending.pad)?;
        self.pos = pending.start + pending.len + pending.pad;
        Ok(())
    }

    fn skip(&mut self, n: u64) -> Result<(), Error> {
        if n == 0 {
            return Ok(());
        }
        if let Some(actual) = self.source.position() {
            let actual = actual?;
            if let Some(result) = self.source.try_seek(actual + n) {
                result?;
                self.pos += n;
                return Ok(());
            }
        }
        let mut buf = [0u8; 4];
        self.source.read_exact(&mut buf[..n as usize])?;
        self.pos += n;
        Ok(())
    }

    fn read_exact_mapped(&mut self, buf: &mut [u8], kind: DataErrorKind) -> Result<(), Error> {
        match self.source.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::data(kind, self.pos)),
            Err(e) => Err(e.into()),
        }
    }
}

/// A bounded `Read` over a regular-file entry's body, borrowed from
/// the [`CpioReader`] that yielded it.
pub struct BodyReader<'r, S: Source> {
    reader: &'r mut CpioReader<S>,
}

impl<S: Source> Read for BodyReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (start, len, saved_pos) = {
            let pending = self
                .reader
                .pending
                .as_ref()
                .expect("body reader used after its entry was finished");
            (self.reader.origin + pending.start, pending.len, pending.pos)
        };
        let mut sub = SubStream::new(&mut self.reader.source, start, len);
        sub.set_position(saved_pos)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let n = sub.read(buf)?;
        let new_pos = sub.position();
        drop(sub);
        self.reader.pending.as_mut().unwrap().pos = new_pos;
        Ok(n)
    }
}
