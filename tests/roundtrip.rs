// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios exercising the public API: a filesystem tree
//! written to a newc archive and read back, and one entry written and
//! read manually without going through a filesystem at all.

use std::io::{Cursor, Read};

use cpiofs::fs::{Content, CopyMode, SearchOption};
use cpiofs::header::{FileType, HeaderKind};
use cpiofs::{CpioEntry, CpioReader, CpioWriter, Filesystem, Seekable};

fn write_archive(fs: &mut Filesystem, at: cpiofs::InodeIndex) -> Vec<u8> {
    let mut writer = CpioWriter::new(Vec::new());
    cpiofs::archive(fs, at, &mut writer).unwrap();
    writer.finish().unwrap()
}

fn read_archive(buf: Vec<u8>) -> Filesystem {
    let mut fs = Filesystem::new();
    let root = fs.root();
    let mut reader = CpioReader::new(Seekable(Cursor::new(buf))).unwrap();
    cpiofs::extract(&mut fs, root, &mut reader, false).unwrap();
    fs
}

#[test]
fn basic_writer_round_trip() {
    let mut fs = Filesystem::new();
    let root = fs.root();
    fs.create_directory(root, "/dir1/dir2", true).unwrap();
    fs.create_file(root, "/dir1/file1.txt", Some(Content::from_bytes(b"Hello World".to_vec())), true)
        .unwrap();

    let archive = write_archive(&mut fs, root);
    let readback = read_archive(archive);
    let root2 = readback.root();

    let mut paths: Vec<String> = readback
        .enumerate(root2, SearchOption::AllDirectories, None)
        .unwrap()
        .into_iter()
        .map(|(p, _)| p)
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["/dir1", "/dir1/dir2", "/dir1/file1.txt"]);

    let file = readback.get(root2, "/dir1/file1.txt").unwrap();
    let mut body = Vec::new();
    match readback.inode(file).unwrap().content().unwrap().clone() {
        Content::Bytes(b) => body = b,
        other => panic!("unexpected content: {other:?}"),
    }
    assert_eq!(body, b"Hello World");
}

#[test]
fn manual_single_entry_round_trip() {
    let mut writer = CpioWriter::new(Vec::new());
    let entry = CpioEntry {
        kind: HeaderKind::NewAscii,
        inode_number: 42,
        file_type: FileType::RegularFile,
        mode: 0o600,
        uid: 0,
        gid: 0,
        nlink: 1,
        mtime: 1262304000,
        length: 11,
        dev: (1, 3),
        rdev: (0, 0),
        checksum: 0,
        name: "test.txt".to_string(),
        link_name: None,
    };
    let mut data: &[u8] = b"Hello World";
    writer.add_entry(&entry, Some(&mut data)).unwrap();
    let archive = writer.finish().unwrap();

    let mut reader = CpioReader::new(Seekable(Cursor::new(archive))).unwrap();
    let read = reader.next_entry().unwrap().unwrap();
    assert_eq!(read.name, "test.txt");
    assert_eq!(read.file_type, FileType::RegularFile);
    assert_eq!(read.mode, 0o600);
    assert_eq!(read.nlink, 1);
    assert_eq!(read.mtime, 1262304000);
    assert_eq!(read.dev, (1, 3));
    assert_eq!(read.length, 11);

    let mut body = Vec::new();
    reader.body().unwrap().read_to_end(&mut body).unwrap();
    assert_eq!(body, b"Hello World");
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn hardlink_preservation_round_trip() {
    let mut fs = Filesystem::new();
    let root = fs.root();
    let a = fs.create_file(root, "/a", Some(Content::from_bytes(b"x".to_vec())), false).unwrap();
    fs.create_hard_link(root, "/b", a).unwrap();
    assert_eq!(fs.inode(a).unwrap().nlink(), 2);

    let archive = write_archive(&mut fs, root);
    let readback = read_archive(archive);
    let root2 = readback.root();

    let ra = readback.get(root2, "/a").unwrap();
    let rb = readback.get(root2, "/b").unwrap();
    assert_eq!(ra, rb);
    assert_eq!(readback.inode(ra).unwrap().nlink(), 2);
}

#[test]
fn symlink_round_trip() {
    let mut fs = Filesystem::new();
    let root = fs.root();
    fs.create_symbolic_link(root, "/l", "dir1/file1.txt", false).unwrap();

    let archive = write_archive(&mut fs, root);
    let readback = read_archive(archive);
    let root2 = readback.root();

    let l = readback.get(root2, "/l").unwrap();
    let inode = readback.inode(l).unwrap();
    assert_eq!(inode.kind(), cpiofs::fs::Kind::SymbolicLink);
    assert_eq!(inode.symlink_target(), Some("dir1/file1.txt"));
}

#[test]
fn archive_copy_mode_preserves_hard_link_identity_across_subtrees() {
    let mut fs = Filesystem::new();
    let root = fs.root();
    fs.create_directory(root, "/src", false).unwrap();
    let a = fs.create_file(root, "/src/a", Some(Content::from_bytes(b"x".to_vec())), false).unwrap();
    fs.create_hard_link(root, "/src/b", a).unwrap();

    fs.copy(root, "/src", "/dst", CopyMode::Archive).unwrap();

    let dst_a = fs.get(root, "/dst/a").unwrap();
    let dst_b = fs.get(root, "/dst/b").unwrap();
    assert_eq!(dst_a, dst_b);
    assert_ne!(dst_a, a);
    assert_eq!(fs.inode(dst_a).unwrap().nlink(), 2);
    assert_eq!(fs.inode(a).unwrap().nlink(), 2);
    fs.check_nlink_invariants().unwrap();
}

#[test]
fn trailer_only_archive_is_exactly_124_bytes() {
    let writer = CpioWriter::new(Vec::new());
    let archive = writer.finish().unwrap();
    assert_eq!(archive.len(), cpiofs::header::TRAILER_LEN);

    let mut reader = CpioReader::new(Seekable(Cursor::new(archive))).unwrap();
    assert!(reader.next_entry().unwrap().is_none());
}
