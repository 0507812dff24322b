// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The in-memory UNIX filesystem model: a tree of named entries
//! backed by shared inodes (spec.md §3-§4.7). Rather than an `Rc
//! <RefCell<_>>` graph of self-referential nodes, inodes live in one
//! arena (`Filesystem::inodes`) keyed by the monotonic [`InodeIndex`]
//! spec.md's allocator hands out; directory entries are plain
//! name-to-index mappings. Hard links fall out naturally: two
//! directories' maps can point at the same index, and `nlink` is
//! tracked explicitly alongside every attach/detach, matching spec.md
//! §9's "inode is identity, entries are owners, nlink is the handle
//! count" framing.
//!
//! Only directories carry a `parent` pointer (spec.md disallows hard
//! links to directories, so a directory inode is always reachable
//! from exactly one place); non-directory inodes can be multiply
//! referenced and so have no single parent to record.

pub mod content;
mod glob;
pub mod inode;

use std::collections::{HashMap, HashSet};

pub use content::Content;
pub use inode::{InodeIndex, Kind, Timestamps};

use crate::error::{Error, UsageError};
use crate::path;

/// Which kind of device special file [`Filesystem::create_device`]
/// should create.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceKind {
    Char,
    Block,
}

/// The four copy strategies spec.md §4.7's `Copy` operation supports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CopyMode {
    /// Copies one entry: file content is duplicated, non-file kinds
    /// share the source inode (an extra hard link).
    Single,
    /// Deep-copies a subtree, cloning every inode -- no sharing.
    Recursive,
    /// Deep-copies a subtree's shape but every inode in it is shared
    /// (hard-linked) with the source, including across what were
    /// previously distinct files.
    RecursiveWithHardLinks,
    /// Deep-copies a subtree, cloning inodes, but entries that were
    /// hard-linked to each other *within the source subtree* remain
    /// hard-linked to each other in the copy (via a per-copy inode
    /// mapping table), rather than becoming independent copies.
    Archive,
}

/// How deep [`Filesystem::enumerate`] descends.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchOption {
    TopDirectoryOnly,
    AllDirectories,
}

/// The root-owning container: an inode arena plus the monotonic
/// allocator spec.md §3 describes. Every operation that takes a path
/// also takes an explicit `at: InodeIndex` "receiver" directory --
/// absolute paths (a leading `/`) are resolved against
/// [`Filesystem::root`] regardless of `at`, relative ones against
/// `at` itself, matching spec.md §6's path surface.
#[derive(Debug)]
pub struct Filesystem {
    inodes: HashMap<InodeIndex, inode::Inode>,
    next_index: u64,
}

impl Default for Filesystem {
    fn default() -> Filesystem {
        Filesystem::new()
    }
}

impl Filesystem {
    pub fn new() -> Filesystem {
        let mut inodes = HashMap::new();
        inodes.insert(InodeIndex::ROOT, inode::Inode::new_directory(InodeIndex::ROOT, None));
        Filesystem { inodes, next_index: 1 }
    }

    pub fn root(&self) -> InodeIndex {
        InodeIndex::ROOT
    }

    fn alloc(&mut self) -> InodeIndex {
        let idx = InodeIndex(self.next_index);
        self.next_index += 1;
        idx
    }

    pub fn inode(&self, idx: InodeIndex) -> Result<&inode::Inode, Error> {
        self.inodes.get(&idx).ok_or_else(|| UsageError::NotFound(idx.to_string()).into())
    }

    pub fn inode_mut(&mut self, idx: InodeIndex) -> Result<&mut inode::Inode, Error> {
        self.inodes.get_mut(&idx).ok_or_else(|| UsageError::NotFound(idx.to_string()).into())
    }

    pub fn inode_count(&self) -> usize {
        self.inodes.len()
    }

    // -- path resolution -----------------------------------------------

    /// Resolves `path` against `at` (or against the root, if `path` is
    /// absolute), failing on the first missing or non-directory
    /// intermediate component.
    pub fn resolve(&self, at: InodeIndex, path: &str) -> Result<InodeIndex, Error> {
        let normalized = path::normalize(path);
        let rooted = path::is_rooted(&normalized);
        let segments = path::split_components(&normalized)?;
        let mut current = if rooted { self.root() } else { at };
        for seg in segments {
            if seg == ".." {
                current = self
                    .inode(current)?
                    .parent_index()
                    .ok_or_else(|| UsageError::NotFound(path.to_string()))?;
                continue;
            }
            let next = self.inode(current)?.children().ok().and_then(|c| c.get(seg).copied());
            current = next.ok_or_else(|| UsageError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }

    pub fn try_get(&self, at: InodeIndex, path: &str) -> Option<InodeIndex> {
        self.resolve(at, path).ok()
    }

    pub fn get(&self, at: InodeIndex, path: &str) -> Result<InodeIndex, Error> {
        self.resolve(at, path)
    }

    /// Creates any missing directories along `path`, erroring if an
    /// existing, non-directory component is in the way.
    fn mkdir_p(&mut self, at: InodeIndex, path: &str) -> Result<InodeIndex, Error> {
        let normalized = path::normalize(path);
        let rooted = path::is_rooted(&normalized);
        let segments: Vec<String> =
            path::split_components(&normalized)?.into_iter().map(str::to_string).collect();
        let mut current = if rooted { self.root() } else { at };
        for seg in segments {
            if seg == ".." {
                current = self
                    .inode(current)?
                    .parent_index()
                    .ok_or_else(|| UsageError::NotFound(path.to_string()))?;
                continue;
            }
            let existing = self.inode(current)?.children()?.get(&seg).copied();
            current = match existing {
                Some(idx) => {
                    if self.inode(idx)?.kind() != Kind::Directory {
                        return Err(UsageError::NotADirectory(seg).into());
                    }
                    idx
                }
                None => self.create_directory_raw(current, &seg)?,
            };
        }
        Ok(current)
    }

    /// Splits `path` into `(parent_directory_index, final_name)`,
    /// creating missing parent directories iff `mkparents`.
    fn resolve_parent(
        &mut self,
        at: InodeIndex,
        path: &str,
        mkparents: bool,
    ) -> Result<(InodeIndex, String), Error> {
        let normalized = path::normalize(path);
        let dir_part = path::directory_name(&normalized);
        let name = path::file_name(&normalized).to_string();
        if name.is_empty() || name == "." || name == ".." {
            return Err(UsageError::EmptyName.into());
        }
        path::validate(&name)?;
        let parent = if dir_part.is_empty() {
            at
        } else if mkparents {
            self.mkdir_p(at, dir_part)?
        } else {
            self.resolve(at, dir_part)?
        };
        // Confirm it's actually a directory (resolve/mkdir_p both
        // guarantee this already, but an empty dir_part leaves `at`
        // unchecked).
        self.inode(parent)?.children()?;
        Ok((parent, name))
    }

    fn require_vacant(&self, parent: InodeIndex, name: &str) -> Result<(), Error> {
        if self.inode(parent)?.children()?.contains_key(name) {
            return Err(UsageError::AlreadyExists(name.to_string()).into());
        }
        Ok(())
    }

    // -- creation --------------------------------------------------------

    fn create_directory_raw(&mut self, parent: InodeIndex, name: &str) -> Result<InodeIndex, Error> {
        let idx = self.alloc();
        self.inodes.insert(idx, inode::Inode::new_directory(idx, Some(parent)));
        self.inode_mut(parent)?.children_mut()?.insert(name.to_string(), idx);
        self.inode_mut(parent)?.bump_nlink(1);
        Ok(idx)
    }

    fn attach_nondir(&mut self, parent: InodeIndex, name: &str, idx: InodeIndex) -> Result<(), Error> {
        self.inode_mut(parent)?.children_mut()?.insert(name.to_string(), idx);
        Ok(())
    }

    pub fn create_directory(
        &mut self,
        at: InodeIndex,
        path: &str,
        mkparents: bool,
    ) -> Result<InodeIndex, Error> {
        let (parent, name) = self.resolve_parent(at, path, mkparents)?;
        self.require_vacant(parent, &name)?;
        self.create_directory_raw(parent, &name)
    }

    pub fn create_file(
        &mut self,
        at: InodeIndex,
        path: &str,
        content: Option<Content>,
        mkparents: bool,
    ) -> Result<InodeIndex, Error> {
        let (parent, name) = self.resolve_parent(at, path, mkparents)?;
        self.require_vacant(parent, &name)?;
        let idx = self.alloc();
        self.inodes.insert(idx, inode::Inode::new_file(idx, content.unwrap_or(Content::Bytes(Vec::new()))));
        self.attach_nondir(parent, &name, idx)?;
        Ok(idx)
    }

    pub fn create_symbolic_link(
        &mut self,
        at: InodeIndex,
        path: &str,
        target: &str,
        mkparents: bool,
    ) -> Result<InodeIndex, Error> {
        if target.is_empty() {
            return Err(UsageError::EmptySymlinkTarget.into());
        }
        let (parent, name) = self.resolve_parent(at, path, mkparents)?;
        self.require_vacant(parent, &name)?;
        let idx = self.alloc();
        self.inodes.insert(idx, inode::Inode::new_symlink(idx, target.to_string()));
        self.attach_nondir(parent, &name, idx)?;
        Ok(idx)
    }

    pub fn create_device(
        &mut self,
        at: InodeIndex,
        path: &str,
        kind: DeviceKind,
        major: u32,
        minor: u32,
        mkparents: bool,
    ) -> Result<InodeIndex, Error> {
        let (parent, name) = self.resolve_parent(at, path, mkparents)?;
        self.require_vacant(parent, &name)?;
        let ikind = match kind {
            DeviceKind::Char => Kind::CharDevice,
            DeviceKind::Block => Kind::BlockDevice,
        };
        let idx = self.alloc();
        self.inodes.insert(idx, inode::Inode::new_device(idx, ikind, major, minor));
        self.attach_nondir(parent, &name, idx)?;
        Ok(idx)
    }

    /// Creates a new entry at `path` sharing `existing`'s inode.
    /// `existing` must name a regular file or device; spec.md §3
    /// forbids hard links to directories (nlink bookkeeping would be
    /// ambiguous) and requires a symbolic link's own `nlink` stay `1`.
    pub fn create_hard_link(
        &mut self,
        at: InodeIndex,
        path: &str,
        existing: InodeIndex,
    ) -> Result<InodeIndex, Error> {
        match self.inode(existing)?.kind() {
            Kind::Directory => return Err(UsageError::HardLinkToDirectory.into()),
            Kind::SymbolicLink => {
                return Err(UsageError::Other("hard links to symbolic links are not supported").into());
            }
            Kind::RegularFile | Kind::CharDevice | Kind::BlockDevice => {}
        }
        let (parent, name) = self.resolve_parent(at, path, false)?;
        self.require_vacant(parent, &name)?;
        self.inode_mut(existing)?.bump_nlink(1);
        self.attach_nondir(parent, &name, existing)?;
        tracing::trace!(ino = existing.get(), name = %name, "created hard link");
        Ok(existing)
    }

    // -- deletion ----------------------------------------------------------

    fn split_existing(&self, at: InodeIndex, path: &str) -> Result<(InodeIndex, String), Error> {
        let normalized = path::normalize(path);
        let dir_part = path::directory_name(&normalized);
        let name = path::file_name(&normalized).to_string();
        if name.is_empty() {
            return Err(UsageError::CannotDeleteRoot.into());
        }
        let parent = if dir_part.is_empty() { at } else { self.resolve(at, dir_part)? };
        Ok((parent, name))
    }

    /// Detaches and recursively destroys the entry named `name` under
    /// `parent`, decrementing every inode's `nlink` along the way.
    fn remove_entry(&mut self, parent: InodeIndex, name: &str) -> Result<(), Error> {
        let child = self
            .inode(parent)?
            .children()?
            .get(name)
            .copied()
            .ok_or_else(|| UsageError::NotFound(name.to_string()))?;
        self.inode_mut(parent)?.children_mut()?.remove(name);
        self.destroy(child, parent)
    }

    fn destroy(&mut self, idx: InodeIndex, old_parent: InodeIndex) -> Result<(), Error> {
        if self.inode(idx)?.kind() == Kind::Directory {
            let names: Vec<String> = self.inode(idx)?.children()?.keys().cloned().collect();
            for name in names {
                self.remove_entry(idx, &name)?;
            }
            self.inode_mut(old_parent)?.bump_nlink(-1);
            self.inodes.remove(&idx);
        } else {
            let inode = self.inode_mut(idx)?;
            inode.bump_nlink(-1);
            if inode.nlink() == 0 {
                self.inodes.remove(&idx);
            }
        }
        Ok(())
    }

    pub fn delete(&mut self, at: InodeIndex, path: &str) -> Result<(), Error> {
        let normalized = path::normalize(path);
        if path::is_rooted(&normalized) && normalized == "/" {
            return Err(UsageError::CannotDeleteRoot.into());
        }
        let (parent, name) = self.split_existing(at, path)?;
        tracing::trace!(parent = parent.get(), name = %name, "deleting entry");
        self.remove_entry(parent, &name)
    }

    // -- move ----------------------------------------------------------

    pub fn mv(
        &mut self,
        at: InodeIndex,
        src: &str,
        dst: &str,
        mkparents: bool,
        overwrite: bool,
    ) -> Result<(), Error> {
        let (src_parent, src_name) = self.split_existing(at, src)?;
        let src_idx = self
            .inode(src_parent)?
            .children()?
            .get(&src_name)
            .copied()
            .ok_or_else(|| UsageError::NotFound(src.to_string()))?;

        let dst_normalized = path::normalize(dst);
        let (dst_parent, dst_name) = match self.resolve(at, &dst_normalized) {
            Ok(existing) if self.inode(existing)?.kind() == Kind::Directory => {
                (existing, src_name.clone())
            }
            Ok(_existing) => {
                if !overwrite {
                    return Err(UsageError::AlreadyExists(dst.to_string()).into());
                }
                let dir_part = path::directory_name(&dst_normalized);
                let name = path::file_name(&dst_normalized).to_string();
                let parent = if dir_part.is_empty() { at } else { self.resolve(at, dir_part)? };
                self.remove_entry(parent, &name)?;
                (parent, name)
            }
            Err(_) => {
                let dir_part = path::directory_name(&dst_normalized);
                let name = path::file_name(&dst_normalized).to_string();
                if name.is_empty() {
                    return Err(UsageError::EmptyName.into());
                }
                let parent = if dir_part.is_empty() {
                    at
                } else if mkparents {
                    self.mkdir_p(at, dir_part)?
                } else {
                    self.resolve(at, dir_part)?
                };
                (parent, name)
            }
        };

        if (dst_parent, dst_name.as_str()) != (src_parent, src_name.as_str()) {
            self.require_vacant(dst_parent, &dst_name)?;
        }

        self.inode_mut(src_parent)?.children_mut()?.remove(&src_name);
        if self.inode(src_idx)?.kind() == Kind::Directory {
            self.inode_mut(src_parent)?.bump_nlink(-1);
            self.inode_mut(dst_parent)?.bump_nlink(1);
            self.inode_mut(src_idx)?.set_parent_index(Some(dst_parent));
        }
        self.inode_mut(dst_parent)?.children_mut()?.insert(dst_name, src_idx);
        Ok(())
    }

    // -- copy ----------------------------------------------------------

    pub fn copy(&mut self, at: InodeIndex, src: &str, dst: &str, mode: CopyMode) -> Result<InodeIndex, Error> {
        let src_idx = self.resolve(at, src)?;
        let dst_normalized = path::normalize(dst);
        if self.try_get(at, &dst_normalized).is_some() {
            return Err(UsageError::AlreadyExists(dst.to_string()).into());
        }
        let dir_part = path::directory_name(&dst_normalized);
        let dst_name = path::file_name(&dst_normalized).to_string();
        if dst_name.is_empty() {
            return Err(UsageError::EmptyName.into());
        }
        let dst_parent = if dir_part.is_empty() { at } else { self.resolve(at, dir_part)? };

        match mode {
            CopyMode::Single => self.copy_single(src_idx, dst_parent, &dst_name),
            CopyMode::Recursive => {
                let mut mapping = HashMap::new();
                self.copy_recursive(src_idx, dst_parent, &dst_name, false, &mut mapping)
            }
            CopyMode::RecursiveWithHardLinks => {
                self.copy_recursive_hardlinks(src_idx, dst_parent, &dst_name)
            }
            CopyMode::Archive => {
                let mut mapping = HashMap::new();
                self.copy_recursive(src_idx, dst_parent, &dst_name, true, &mut mapping)
            }
        }
    }

    fn copy_single(
        &mut self,
        src_idx: InodeIndex,
        dst_parent: InodeIndex,
        dst_name: &str,
    ) -> Result<InodeIndex, Error> {
        match self.inode(src_idx)?.kind() {
            Kind::Directory => {
                Err(UsageError::WrongType("Single copy mode does not apply to directories").into())
            }
            Kind::RegularFile => {
                let content = self.inode_mut(src_idx)?.duplicate_content()?;
                let idx = self.alloc();
                let mut fresh = inode::Inode::new_file(idx, content);
                fresh.copy_ownership_from(self.inode(src_idx)?);
                self.inodes.insert(idx, fresh);
                self.attach_nondir(dst_parent, dst_name, idx)?;
                Ok(idx)
            }
            Kind::SymbolicLink | Kind::CharDevice | Kind::BlockDevice => {
                self.inode_mut(src_idx)?.bump_nlink(1);
                self.attach_nondir(dst_parent, dst_name, src_idx)?;
                Ok(src_idx)
            }
        }
    }

    fn copy_recursive(
        &mut self,
        src_idx: InodeIndex,
        dst_parent: InodeIndex,
        dst_name: &str,
        archive_mode: bool,
        mapping: &mut HashMap<InodeIndex, InodeIndex>,
    ) -> Result<InodeIndex, Error> {
        if archive_mode {
            if let Some(&mapped) = mapping.get(&src_idx) {
                self.inode_mut(mapped)?.bump_nlink(1);
                self.attach_nondir(dst_parent, dst_name, mapped)?;
                return Ok(mapped);
            }
        }
        let kind = self.inode(src_idx)?.kind();
        let new_idx = match kind {
            Kind::Directory => {
                let idx = self.create_directory_raw(dst_parent, dst_name)?;
                if archive_mode {
                    mapping.insert(src_idx, idx);
                }
                let names: Vec<String> = self.inode(src_idx)?.children()?.keys().cloned().collect();
                for name in names {
                    let child = self.inode(src_idx)?.children()?.get(&name).copied().unwrap();
                    self.copy_recursive(child, idx, &name, archive_mode, mapping)?;
                }
                idx
            }
            Kind::RegularFile => {
                let content = self.inode_mut(src_idx)?.duplicate_content()?;
                let idx = self.alloc();
                let mut fresh = inode::Inode::new_file(idx, content);
                fresh.copy_ownership_from(self.inode(src_idx)?);
                self.inodes.insert(idx, fresh);
                self.attach_nondir(dst_parent, dst_name, idx)?;
                if archive_mode {
                    mapping.insert(src_idx, idx);
                }
                idx
            }
            Kind::SymbolicLink => {
                let target = self.inode(src_idx)?.symlink_target().unwrap().to_string();
                let idx = self.alloc();
                let mut fresh = inode::Inode::new_symlink(idx, target);
                fresh.copy_ownership_from(self.inode(src_idx)?);
                self.inodes.insert(idx, fresh);
                self.attach_nondir(dst_parent, dst_name, idx)?;
                if archive_mode {
                    mapping.insert(src_idx, idx);
                }
                idx
            }
            Kind::CharDevice | Kind::BlockDevice => {
                let (major, minor) = self.inode(src_idx)?.device().unwrap();
                let idx = self.alloc();
                let mut fresh = inode::Inode::new_device(idx, kind, major, minor);
                fresh.copy_ownership_from(self.inode(src_idx)?);
                self.inodes.insert(idx, fresh);
                self.attach_nondir(dst_parent, dst_name, idx)?;
                if archive_mode {
                    mapping.insert(src_idx, idx);
                }
                idx
            }
        };
        Ok(new_idx)
    }

    fn copy_recursive_hardlinks(
        &mut self,
        src_idx: InodeIndex,
        dst_parent: InodeIndex,
        dst_name: &str,
    ) -> Result<InodeIndex, Error> {
        if self.inode(src_idx)?.kind() == Kind::Directory {
            let idx = self.create_directory_raw(dst_parent, dst_name)?;
            let names: Vec<String> = self.inode(src_idx)?.children()?.keys().cloned().collect();
            for name in names {
                let child = self.inode(src_idx)?.children()?.get(&name).copied().unwrap();
                self.copy_recursive_hardlinks(child, idx, &name)?;
            }
            Ok(idx)
        } else {
            self.inode_mut(src_idx)?.bump_nlink(1);
            self.attach_nondir(dst_parent, dst_name, src_idx)?;
            Ok(src_idx)
        }
    }

    // -- enumeration -----------------------------------------------------

    /// The absolute path of directory `idx`, found by walking `parent`
    /// links up to the root and searching each parent's children for
    /// the matching index. `idx` must be a directory (or the root).
    fn path_of(&self, idx: InodeIndex) -> Result<String, Error> {
        if idx == self.root() {
            return Ok(String::new());
        }
        let parent = self
            .inode(idx)?
            .parent_index()
            .ok_or_else(|| UsageError::Other("directory is detached"))?;
        let name = self
            .inode(parent)?
            .children()?
            .iter()
            .find(|&(_, &v)| v == idx)
            .map(|(k, _)| k.clone())
            .ok_or_else(|| UsageError::Other("directory missing from its own parent"))?;
        let prefix = self.path_of(parent)?;
        Ok(format!("{prefix}/{name}"))
    }

    /// Lazily would be preferable, but since mutation must not
    /// invalidate an in-flight enumeration (spec.md §4.7), this
    /// collects full paths into an owned, already name-sorted
    /// snapshot up front.
    pub fn enumerate(
        &self,
        at: InodeIndex,
        option: SearchOption,
        pattern: Option<&str>,
    ) -> Result<Vec<(String, InodeIndex)>, Error> {
        let base = self.path_of(at)?;
        let mut out = Vec::new();
        self.enumerate_into(at, &base, option, pattern, &mut out)?;
        Ok(out)
    }

    fn enumerate_into(
        &self,
        dir: InodeIndex,
        dir_path: &str,
        option: SearchOption,
        pattern: Option<&str>,
        out: &mut Vec<(String, InodeIndex)>,
    ) -> Result<(), Error> {
        for (name, &child) in self.inode(dir)?.children()? {
            let full = format!("{dir_path}/{name}");
            if pattern.is_none_or(|p| glob::matches(p, name)) {
                out.push((full.clone(), child));
            }
            if self.inode(child)?.kind() == Kind::Directory
                && matches!(option, SearchOption::AllDirectories)
            {
                self.enumerate_into(child, &full, option, pattern, out)?;
            }
        }
        Ok(())
    }

    // -- invariant checking (used by tests, spec.md §8 properties 8-10) --

    /// Every inode's `nlink` equals the number of entries actually
    /// referencing it (directories: `2 + child directory count`; every
    /// other kind: the number of directory-map entries naming it).
    pub fn check_nlink_invariants(&self) -> Result<(), Error> {
        let mut refcount: HashMap<InodeIndex, u32> = HashMap::new();
        for inode in self.inodes.values() {
            if let Ok(children) = inode.children() {
                for &child in children.values() {
                    *refcount.entry(child).or_default() += 1;
                }
            }
        }
        for (&idx, inode) in &self.inodes {
            match inode.kind() {
                Kind::Directory => {
                    let child_dirs = inode
                        .children()?
                        .values()
                        .filter(|&&c| self.inodes.get(&c).is_some_and(|i| i.kind() == Kind::Directory))
                        .count() as u32;
                    let expected = 2 + child_dirs;
                    if inode.nlink() != expected {
                        return Err(UsageError::Other(
                            "directory nlink does not equal 2 + child directory count",
                        )
                        .into());
                    }
                }
                _ => {
                    let expected = *refcount.get(&idx).unwrap_or(&0);
                    if inode.nlink() != expected {
                        return Err(UsageError::Other(
                            "non-directory nlink does not equal its reference count",
                        )
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Every inode is reachable from the root by walking directory
    /// children (spec.md §8 property 10).
    pub fn all_reachable(&self) -> bool {
        let mut visited = HashSet::new();
        visited.insert(self.root());
        let mut stack = vec![self.root()];
        while let Some(idx) = stack.pop() {
            if let Ok(children) = self.inode(idx).and_then(|i| i.children()) {
                for &child in children.values() {
                    if visited.insert(child) {
                        stack.push(child);
                    }
                }
            }
        }
        visited.len() == self.inodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_file(fs: &mut Filesystem, at: InodeIndex, path: &str, data: &[u8]) -> InodeIndex {
        fs.create_file(at, path, Some(Content::from_bytes(data.to_vec())), true).unwrap()
    }

    #[test]
    fn creates_nested_directories_and_a_file() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        fs.create_directory(root, "/dir1/dir2", true).unwrap();
        new_file(&mut fs, root, "/dir1/file1.txt", b"Hello World");

        let mut paths = fs
            .enumerate(root, SearchOption::AllDirectories, None)
            .unwrap()
            .into_iter()
            .map(|(p, _)| p)
            .collect::<Vec<_>>();
        paths.sort();
        assert_eq!(paths, vec!["/dir1", "/dir1/dir2", "/dir1/file1.txt"]);
        fs.check_nlink_invariants().unwrap();
        assert!(fs.all_reachable());
    }

    #[test]
    fn hard_link_shares_inode_and_bumps_nlink() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        let a = new_file(&mut fs, root, "/a", b"x");
        let b = fs.create_hard_link(root, "/b", a).unwrap();
        assert_eq!(a, b);
        assert_eq!(fs.inode(a).unwrap().nlink(), 2);
        fs.check_nlink_invariants().unwrap();
    }

    #[test]
    fn hard_link_to_directory_is_rejected() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        let dir = fs.create_directory(root, "/d", false).unwrap();
        let err = fs.create_hard_link(root, "/d2", dir).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::HardLinkToDirectory)));
    }

    #[test]
    fn delete_decrements_parent_nlink_for_directories() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        fs.create_directory(root, "/d", false).unwrap();
        assert_eq!(fs.inode(root).unwrap().nlink(), 3);
        fs.delete(root, "/d").unwrap();
        assert_eq!(fs.inode(root).unwrap().nlink(), 2);
        fs.check_nlink_invariants().unwrap();
    }

    #[test]
    fn root_cannot_be_deleted() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        assert!(matches!(
            fs.delete(root, "/").unwrap_err(),
            Error::Usage(UsageError::CannotDeleteRoot)
        ));
    }

    #[test]
    fn move_into_existing_directory_keeps_name() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        new_file(&mut fs, root, "/a.txt", b"1");
        fs.create_directory(root, "/dst", false).unwrap();
        fs.mv(root, "/a.txt", "/dst", false, false).unwrap();
        assert!(fs.try_get(root, "/dst/a.txt").is_some());
        assert!(fs.try_get(root, "/a.txt").is_none());
    }

    #[test]
    fn archive_copy_preserves_hard_link_identity_within_subtree() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        fs.create_directory(root, "/src", false).unwrap();
        let a = new_file(&mut fs, root, "/src/a", b"x");
        fs.create_hard_link(root, "/src/b", a).unwrap();

        fs.copy(root, "/src", "/dst", CopyMode::Archive).unwrap();
        let dst_a = fs.get(root, "/dst/a").unwrap();
        let dst_b = fs.get(root, "/dst/b").unwrap();
        assert_eq!(dst_a, dst_b);
        assert_ne!(dst_a, a);
        assert_eq!(fs.inode(dst_a).unwrap().nlink(), 2);
        fs.check_nlink_invariants().unwrap();
    }

    #[test]
    fn recursive_copy_never_shares_inodes() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        fs.create_directory(root, "/src", false).unwrap();
        let a = new_file(&mut fs, root, "/src/a", b"x");
        fs.create_hard_link(root, "/src/b", a).unwrap();

        fs.copy(root, "/src", "/dst", CopyMode::Recursive).unwrap();
        let dst_a = fs.get(root, "/dst/a").unwrap();
        let dst_b = fs.get(root, "/dst/b").unwrap();
        assert_ne!(dst_a, dst_b);
        fs.check_nlink_invariants().unwrap();
    }

    #[test]
    fn enumerate_respects_glob_pattern() {
        let mut fs = Filesystem::new();
        let root = fs.root();
        new_file(&mut fs, root, "/a.txt", b"");
        new_file(&mut fs, root, "/b.log", b"");
        let results = fs.enumerate(root, SearchOption::TopDirectoryOnly, Some("*.txt")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "/a.txt");
    }
}
