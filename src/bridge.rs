// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translates between the flat CPIO entry stream and the hierarchical
//! filesystem tree, in both directions, preserving inode identity
//! (hard-link groupings) across the round trip.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use crate::entry::CpioEntry;
use crate::error::{DataErrorKind, Error, UsageError};
use crate::fs::inode::Timestamps;
use crate::fs::{Content, DeviceKind, Filesystem, InodeIndex, Kind};
use crate::header::{FileType, HeaderKind};
use crate::perm::Permissions;
use crate::reader::CpioReader;
use crate::substream::Source;
use crate::writer::CpioWriter;

/// Reads every entry from `reader`, materialising it under `at`.
/// Entries sharing an archive `inode_number` become hard links to the
/// same filesystem inode; later occurrences overwrite the inode's
/// payload (content or link target), matching §4.8's read-side
/// tolerance for producers that emit the body on the first or the
/// last occurrence of a hard-linked group.
///
/// `overwrite` controls what happens when an entry's path already
/// names something in `fs` before this call reaches it: `true` deletes
/// the existing entry first, `false` raises [`UsageError::AlreadyExists`].
pub fn extract<S: Source>(
    fs: &mut Filesystem,
    at: InodeIndex,
    reader: &mut CpioReader<S>,
    overwrite: bool,
) -> Result<(), Error> {
    let mut seen: HashMap<u32, InodeIndex> = HashMap::new();
    let mut count = 0u64;

    while let Some(entry) = reader.next_entry()? {
        let body = match entry.file_type {
            FileType::RegularFile => Some(read_body(reader)?),
            _ => None,
        };

        let idx = if let Some(&existing) = seen.get(&entry.inode_number) {
            tracing::trace!(name = %entry.name, ino = entry.inode_number, existing = existing.get(), "linking to existing inode");
            if fs.try_get(at, &entry.name).is_none() {
                fs.create_hard_link(at, &entry.name, existing)?;
            }
            if let Some(content) = body {
                if fs.inode(existing)?.content().is_some_and(|prior| !content_matches(prior, &content)) {
                    tracing::warn!(
                        ino = entry.inode_number,
                        kind = %DataErrorKind::InconsistentHardLinkPayload,
                        "hard-linked entry's body disagrees with an earlier occurrence; keeping this one"
                    );
                }
                fs.inode_mut(existing)?.set_content(content);
            } else if let Some(target) = &entry.link_name {
                if fs.inode(existing)?.symlink_target().is_some_and(|prior| prior != target) {
                    tracing::warn!(
                        ino = entry.inode_number,
                        kind = %DataErrorKind::InconsistentHardLinkPayload,
                        "hard-linked entry's symlink target disagrees with an earlier occurrence; keeping this one"
                    );
                }
                fs.inode_mut(existing)?.set_symlink_target(target.clone());
            }
            existing
        } else {
            materialize_fresh(fs, at, &entry, body, overwrite)?
        };

        seen.insert(entry.inode_number, idx);
        apply_metadata(fs, idx, &entry)?;
        count += 1;
    }
    tracing::debug!(count, "extracted archive");
    Ok(())
}

fn make_room(fs: &mut Filesystem, at: InodeIndex, name: &str, overwrite: bool) -> Result<(), Error> {
    if fs.try_get(at, name).is_some() {
        if overwrite {
            fs.delete(at, name)?;
        } else {
            return Err(UsageError::AlreadyExists(name.to_string()).into());
        }
    }
    Ok(())
}

fn materialize_fresh(
    fs: &mut Filesystem,
    at: InodeIndex,
    entry: &CpioEntry,
    body: Option<Content>,
    overwrite: bool,
) -> Result<InodeIndex, Error> {
    match entry.file_type {
        FileType::Directory => match fs.try_get(at, &entry.name) {
            Some(existing) if fs.inode(existing)?.kind() == Kind::Directory => Ok(existing),
            Some(_) if overwrite => {
                fs.delete(at, &entry.name)?;
                fs.create_directory(at, &entry.name, true)
            }
            Some(_) => Err(UsageError::AlreadyExists(entry.name.clone()).into()),
            None => fs.create_directory(at, &entry.name, true),
        },
        FileType::RegularFile => {
            make_room(fs, at, &entry.name, overwrite)?;
            fs.create_file(at, &entry.name, body, true)
        }
        FileType::SymbolicLink => {
            make_room(fs, at, &entry.name, overwrite)?;
            let target = entry.link_name.as_deref().unwrap_or("");
            fs.create_symbolic_link(at, &entry.name, target, true)
        }
        FileType::CharDevice | FileType::BlockDevice => {
            make_room(fs, at, &entry.name, overwrite)?;
            let kind = if entry.file_type == FileType::CharDevice {
                DeviceKind::Char
            } else {
                DeviceKind::Block
            };
            fs.create_device(at, &entry.name, kind, entry.dev.0, entry.dev.1, true)
        }
        FileType::NamedPipe | FileType::Socket | FileType::Unknown(_) => Err(UsageError::WrongType(
            "archive entry type has no in-memory filesystem representation",
        )
        .into()),
    }
}

/// Best-effort comparison used only to decide whether to warn about a
/// disagreeing hard-link occurrence (spec.md §9's open question);
/// never panics and never consumes a stream-backed `Content` to do it.
fn content_matches(a: &Content, b: &Content) -> bool {
    let bytes = |c: &Content| -> Option<&[u8]> {
        match c {
            Content::Bytes(b) => Some(b.as_slice()),
            Content::Utf8(s) => Some(s.as_bytes()),
            Content::Reader(..) | Content::Deferred(_) => None,
        }
    };
    match (bytes(a), bytes(b)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn read_body<S: Source>(reader: &mut CpioReader<S>) -> Result<Content, Error> {
    let mut buf = Vec::new();
    if let Some(mut body) = reader.body() {
        body.read_to_end(&mut buf)?;
    }
    Ok(Content::from_bytes(buf))
}

fn apply_metadata(fs: &mut Filesystem, idx: InodeIndex, entry: &CpioEntry) -> Result<(), Error> {
    let inode = fs.inode_mut(idx)?;
    inode.set_mode(Permissions::from(entry.mode));
    inode.set_uid(entry.uid);
    inode.set_gid(entry.gid);
    inode.set_dev(entry.dev);
    inode.set_timestamps(Timestamps::at(entry.mtime));
    Ok(())
}

/// Writes the subtree rooted at `at` (a pre-order traversal, directory
/// first, then its entries in name order) to `writer` as a sequence of
/// `AddEntry` calls, followed by the trailer. Does not consume
/// `writer` -- call [`CpioWriter::finish`] separately so callers can
/// archive more than one subtree into the same stream if they choose.
///
/// Takes `&mut Filesystem` rather than `&Filesystem`: a regular file
/// whose content is a `Reader`/`Deferred` value is materialized into
/// bytes the first time it is emitted (see
/// [`crate::fs::inode::Inode::duplicate_content`]), which is itself a
/// mutation of that inode's stored content.
pub fn archive<W: Write>(fs: &mut Filesystem, at: InodeIndex, writer: &mut CpioWriter<W>) -> Result<(), Error> {
    tracing::debug!(root = at.get(), "archiving subtree");
    let mut remaining: HashMap<InodeIndex, u32> = HashMap::new();
    write_subtree(fs, at, "", writer, &mut remaining)
}

fn write_subtree<W: Write>(
    fs: &mut Filesystem,
    dir: InodeIndex,
    prefix: &str,
    writer: &mut CpioWriter<W>,
    remaining: &mut HashMap<InodeIndex, u32>,
) -> Result<(), Error> {
    let children: Vec<(String, InodeIndex)> =
        fs.inode(dir)?.children()?.iter().map(|(k, &v)| (k.clone(), v)).collect();
    for (name, child) in children {
        let archive_name = if prefix.is_empty() { name } else { format!("{prefix}/{name}") };
        write_one(fs, child, &archive_name, writer, remaining)?;
        if fs.inode(child)?.kind() == Kind::Directory {
            write_subtree(fs, child, &archive_name, writer, remaining)?;
        }
    }
    Ok(())
}

fn write_one<W: Write>(
    fs: &mut Filesystem,
    idx: InodeIndex,
    archive_name: &str,
    writer: &mut CpioWriter<W>,
    remaining: &mut HashMap<InodeIndex, u32>,
) -> Result<(), Error> {
    let inode = fs.inode(idx)?;
    let nlink = inode.nlink();
    let left = remaining.entry(idx).or_insert(nlink);
    *left -= 1;
    let emit_body = *left == 0;
    let kind = inode.kind();

    let (file_type, mut length, mut link_name) = match kind {
        Kind::Directory => (FileType::Directory, 0u64, None),
        Kind::RegularFile => (FileType::RegularFile, 0u64, None),
        Kind::SymbolicLink => (FileType::SymbolicLink, 0u64, None),
        Kind::CharDevice => (FileType::CharDevice, 0u64, None),
        Kind::BlockDevice => (FileType::BlockDevice, 0u64, None),
    };

    let body_bytes = if kind == Kind::RegularFile && emit_body {
        let bytes = fs.inode_mut(idx)?.duplicate_content()?.materialize()?;
        length = bytes.len() as u64;
        Some(bytes)
    } else {
        None
    };
    if kind == Kind::SymbolicLink {
        let target = fs.inode(idx)?.symlink_target().unwrap().to_string();
        length = target.len() as u64;
        link_name = Some(target);
    }

    let inode = fs.inode(idx)?;
    let rdev = match kind {
        Kind::CharDevice | Kind::BlockDevice => inode.device().unwrap(),
        _ => (0, 0),
    };

    let entry = CpioEntry {
        kind: HeaderKind::NewAscii,
        inode_number: idx.get() as u32,
        file_type,
        mode: u16::from(inode.mode()),
        uid: inode.uid(),
        gid: inode.gid(),
        nlink,
        mtime: inode.timestamps().modify,
        length,
        dev: inode.dev(),
        rdev,
        checksum: 0,
        name: archive_name.to_string(),
        link_name,
    };

    match body_bytes {
        // `validate_for_write` requires a body iff `length > 0`; an
        // empty regular file must go through the `None` arm just like
        // one with no body at all.
        Some(bytes) if !bytes.is_empty() => {
            let mut cursor = Cursor::new(bytes);
            writer.add_entry(&entry, Some(&mut cursor))?;
        }
        _ => writer.add_entry(&entry, None)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::SearchOption;
    use crate::substream::Seekable;
    use std::io::Cursor as IoCursor;

    #[test]
    fn round_trips_a_small_tree() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        fs.create_directory(root, "/dir1/dir2", true).unwrap();
        fs.create_file(root, "/dir1/file1.txt", Some(Content::from_str("Hello World")), true)
            .unwrap();

        let mut writer = CpioWriter::new(Vec::new());
        archive(&mut fs, root, &mut writer).unwrap();
        let buf = writer.finish().unwrap();

        let mut fs2 = Filesystem::new();
        let root2 = fs2.root();
        let mut reader = CpioReader::new(Seekable(IoCursor::new(buf))).unwrap();
        extract(&mut fs2, root2, &mut reader, false).unwrap();

        let mut paths: Vec<String> = fs2
            .enumerate(root2, SearchOption::AllDirectories, None)
            .unwrap()
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["/dir1", "/dir1/dir2", "/dir1/file1.txt"]);

        let file_idx = fs2.get(root2, "/dir1/file1.txt").unwrap();
        let content = fs2.inode(file_idx).unwrap().content().unwrap().clone();
        assert_eq!(content.materialize().unwrap(), b"Hello World");
    }

    #[test]
    fn empty_regular_file_archives_without_error() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        fs.create_file(root, "/empty", None, true).unwrap();

        let mut writer = CpioWriter::new(Vec::new());
        archive(&mut fs, root, &mut writer).unwrap();
        let buf = writer.finish().unwrap();

        let mut fs2 = Filesystem::new();
        let root2 = fs2.root();
        let mut reader = CpioReader::new(Seekable(IoCursor::new(buf))).unwrap();
        extract(&mut fs2, root2, &mut reader, false).unwrap();

        let file_idx = fs2.get(root2, "/empty").unwrap();
        let content = fs2.inode(file_idx).unwrap().content().unwrap().clone();
        assert_eq!(content.materialize().unwrap(), b"");
    }

    #[test]
    fn hard_link_survives_the_round_trip() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        let a = fs.create_file(root, "/a", Some(Content::from_bytes(b"x".to_vec())), false).unwrap();
        fs.create_hard_link(root, "/b", a).unwrap();
        assert_eq!(fs.inode(a).unwrap().nlink(), 2);

        let mut writer = CpioWriter::new(Vec::new());
        archive(&mut fs, root, &mut writer).unwrap();
        let buf = writer.finish().unwrap();

        let mut fs2 = Filesystem::new();
        let root2 = fs2.root();
        let mut reader = CpioReader::new(Seekable(IoCursor::new(buf))).unwrap();
        extract(&mut fs2, root2, &mut reader, false).unwrap();

        let a2 = fs2.get(root2, "/a").unwrap();
        let b2 = fs2.get(root2, "/b").unwrap();
        assert_eq!(a2, b2);
        assert_eq!(fs2.inode(a2).unwrap().nlink(), 2);
        fs2.check_nlink_invariants().unwrap();
    }

    #[test]
    fn symlink_survives_the_round_trip() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        fs.create_symbolic_link(root, "/l", "dir1/file1.txt", false).unwrap();

        let mut writer = CpioWriter::new(Vec::new());
        archive(&mut fs, root, &mut writer).unwrap();
        let buf = writer.finish().unwrap();

        let mut fs2 = Filesystem::new();
        let root2 = fs2.root();
        let mut reader = CpioReader::new(Seekable(IoCursor::new(buf))).unwrap();
        extract(&mut fs2, root2, &mut reader, false).unwrap();

        let l2 = fs2.get(root2, "/l").unwrap();
        assert_eq!(fs2.inode(l2).unwrap().symlink_target(), Some("dir1/file1.txt"));
    }

    #[test]
    fn disagreeing_hard_link_body_warns_but_does_not_error() {
        let mut writer = CpioWriter::new(Vec::new());
        let first = CpioEntry {
            kind: HeaderKind::NewAscii,
            inode_number: 7,
            file_type: FileType::RegularFile,
            mode: 0o644,
            uid: 0,
            gid: 0,
            nlink: 2,
            mtime: 0,
            length: 1,
            dev: (0, 0),
            rdev: (0, 0),
            checksum: 0,
            name: "a".to_string(),
            link_name: None,
        };
        let mut data_a: &[u8] = b"x";
        writer.add_entry(&first, Some(&mut data_a)).unwrap();

        let mut second = first.clone();
        second.name = "b".to_string();
        let mut data_b: &[u8] = b"y";
        writer.add_entry(&second, Some(&mut data_b)).unwrap();
        let buf = writer.finish().unwrap();

        let mut fs = Filesystem::new();
        let root = fs.root();
        let mut reader = CpioReader::new(Seekable(IoCursor::new(buf))).unwrap();
        extract(&mut fs, root, &mut reader, false).unwrap();

        let b_idx = fs.get(root, "/b").unwrap();
        let content = fs.inode(b_idx).unwrap().content().unwrap().clone();
        assert_eq!(content.materialize().unwrap(), b"y");
    }

    #[test]
    fn content_matches_compares_loaded_bytes_and_skips_streams() {
        assert!(content_matches(&Content::from_bytes(b"a".to_vec()), &Content::from_str("a")));
        assert!(!content_matches(&Content::from_bytes(b"a".to_vec()), &Content::from_str("b")));
        let data: &[u8] = b"a";
        let reader = Content::Reader(Box::new(data), 1);
        assert!(content_matches(&Content::from_bytes(b"z".to_vec()), &reader));
    }
}
