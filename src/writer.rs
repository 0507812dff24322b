// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Streaming newc writer: `AddEntry* -> Finish`, each call emitting one
//! header, its name, and (where the file type carries one) its body,
//! all individually 4-byte-padded against the archive's own running
//! position. `Finish` appends the fixed 124-byte `TRAILER!!!` record.

use std::io::{self, Read, Write};

use crate::entry::CpioEntry;
use crate::error::{Error, StateError, UsageError};
use crate::header::{self, FileType, HeaderKind, Mode, RawHeader};

/// Writer behaviour that doesn't affect wire format.
#[derive(Clone, Copy, Debug)]
pub struct WriterOptions {
    /// If `false`, the caller intends to reclaim the underlying sink
    /// via [`CpioWriter::into_inner`] rather than let it drop with the
    /// writer. Purely documentation -- see that method.
    pub close_on_drop: bool,
}

impl Default for WriterOptions {
    fn default() -> WriterOptions {
        WriterOptions { close_on_drop: true }
    }
}

fn align4_pad(len: u64) -> u64 {
    (4 - (len % 4)) % 4
}

/// A streaming newc writer over `W`. Every entry is validated against
/// §4.6's per-file-type rules before any bytes are emitted, so a
/// rejected `add_entry` call leaves the sink untouched.
pub struct CpioWriter<W: Write> {
    sink: W,
    pos: u64,
    finished: bool,
    options: WriterOptions,
}

impl<W: Write> CpioWriter<W> {
    pub fn new(sink: W) -> CpioWriter<W> {
        Self::with_options(sink, WriterOptions::default())
    }

    pub fn with_options(sink: W, options: WriterOptions) -> CpioWriter<W> {
        CpioWriter { sink, pos: 0, finished: false, options }
    }

    pub fn options(&self) -> WriterOptions {
        self.options
    }

    /// Reclaims the underlying sink. Intended for callers that
    /// constructed this writer with `close_on_drop: false`; only valid
    /// after [`finish`](Self::finish) -- use that instead in the usual
    /// case, since it also appends the trailer.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.sink.write_all(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn pad_to_4(&mut self) -> Result<(), Error> {
        let pad = align4_pad(self.pos) as usize;
        if pad > 0 {
            self.write_all(&[0u8; 4][..pad])?;
        }
        Ok(())
    }

    /// Writes one entry. `body`, if present, must yield exactly
    /// `entry.length` bytes and is only meaningful for
    /// [`FileType::RegularFile`] -- a symbolic link's body is always
    /// its `link_name`, and every other file type carries none.
    pub fn add_entry(&mut self, entry: &CpioEntry, body: Option<&mut dyn Read>) -> Result<(), Error> {
        if self.finished {
            return Err(StateError::Disposed.into());
        }
        entry.validate_for_write(body.is_some())?;

        let filesize: u64 = match entry.file_type {
            FileType::SymbolicLink => entry.link_name.as_deref().unwrap_or("").len() as u64,
            _ => entry.length,
        };
        if filesize > u32::MAX as u64 {
            return Err(UsageError::Other("entry body is too large for the newc 32-bit length field").into());
        }

        let namesize = entry.name.len() as u32 + 1;
        let raw = entry.to_raw(namesize, filesize as u32);
        self.write_all(&raw.format())?;
        self.write_all(entry.name.as_bytes())?;
        self.write_all(&[0])?;
        self.pad_to_4()?;

        match (entry.file_type, body) {
            (FileType::SymbolicLink, _) => {
                self.write_all(entry.link_name.as_deref().unwrap_or("").as_bytes())?;
            }
            (FileType::RegularFile, Some(reader)) => {
                self.copy_body(reader, filesize)?;
            }
            _ => {}
        }
        self.pad_to_4()?;
        tracing::trace!(name = %entry.name, ino = entry.inode_number, kind = ?entry.file_type, size = filesize, "wrote entry");
        Ok(())
    }

    /// Copies exactly `len` bytes from `reader`, erroring if it yields
    /// more or fewer.
    fn copy_body(&mut self, reader: &mut dyn Read, len: u64) -> Result<(), Error> {
        let mut buf = [0u8; 8192];
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            reader.read_exact(&mut buf[..chunk]).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    Error::Usage(UsageError::Other("body reader ended before declared length"))
                } else {
                    Error::Io(e)
                }
            })?;
            self.write_all(&buf[..chunk])?;
            remaining -= chunk as u64;
        }
        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(UsageError::Other("body reader produced more bytes than the declared length").into());
        }
        Ok(())
    }

    /// Appends the 124-byte `TRAILER!!!` record and returns the
    /// underlying sink. The writer must not be used again afterwards.
    pub fn finish(mut self) -> Result<W, Error> {
        self.write_trailer()?;
        Ok(self.sink)
    }

    fn write_trailer(&mut self) -> Result<(), Error> {
        if self.finished {
            return Err(StateError::Disposed.into());
        }
        let namesize = header::TRAILER_NAME.len() as u32 + 1;
        let raw = RawHeader {
            kind: HeaderKind::NewAscii,
            ino: 0,
            mode: Mode(0),
            uid: 0,
            gid: 0,
            nlink: 1,
            mtime: 0,
            filesize: 0,
            devmajor: 0,
            devminor: 0,
            rdevmajor: 0,
            rdevminor: 0,
            namesize,
            check: 0,
        };
        self.write_all(&raw.format())?;
        self.write_all(header::TRAILER_NAME.as_bytes())?;
        self.write_all(&[0])?;
        self.pad_to_4()?;
        self.finished = true;
        tracing::debug!(total_bytes = self.pos, "wrote trailer");
        Ok(())
    }
}
