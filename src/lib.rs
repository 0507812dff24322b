// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A CPIO "newc" archive codec and an in-memory UNIX filesystem model,
//! plus a bridge that translates between the two while preserving
//! hard-link identity.
//!
//! - [`reader`]/[`writer`] stream archive entries in and out of any
//!   [`std::io::Read`]/[`std::io::Write`] sink; [`entry::CpioEntry`] is
//!   the parsed, owned form of one record.
//! - [`fs`] is the arena-backed filesystem tree: directories, regular
//!   files, symbolic links, and device nodes, addressed by
//!   [`fs::InodeIndex`] rather than by pointer.
//! - [`bridge::extract`]/[`bridge::archive`] move a whole subtree
//!   between the two representations in one call.

pub mod bridge;
pub mod entry;
pub mod error;
pub mod fs;
pub mod header;
pub mod hex;
pub mod path;
pub mod perm;
pub mod reader;
pub mod substream;
pub mod writer;

pub use bridge::{archive, extract};
pub use entry::CpioEntry;
pub use error::{DataErrorKind, Error, Result, StateError, UsageError};
pub use fs::{Content, Filesystem, InodeIndex};
pub use reader::CpioReader;
pub use substream::{Seekable, Sequential, Source};
pub use writer::CpioWriter;
