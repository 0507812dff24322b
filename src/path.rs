// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UNIX path validation and normalization. Paths are treated as byte
//! sequences with `/` as the only separator and NUL as the only
//! forbidden byte; we additionally require UTF-8 at the filesystem
//! API boundary (see [`crate::fs`]).

use crate::error::{Error, UsageError};

/// Rejects a path containing NUL. Empty strings are accepted here;
/// callers that require a nonempty path check that themselves.
pub fn validate(p: &str) -> Result<(), Error> {
    if p.as_bytes().contains(&0) {
        return Err(UsageError::InvalidPath.into());
    }
    Ok(())
}

/// Whether `p` is an absolute (rooted) path.
pub fn is_rooted(p: &str) -> bool {
    p.as_bytes().first() == Some(&b'/')
}

/// Normalizes `p`: drops `.` segments, collapses repeated `/`, and
/// resolves `..` against the segments accumulated so far, without
/// climbing past an already-irreducible leading run of `..` (so
/// `a/../../b` normalizes to `../b`, not an error). A leading `/` is
/// preserved. An empty result becomes `.` for relative inputs and `/`
/// for absolute ones.
///
/// If `p` was already normalized, the returned `String` is byte-for-
/// byte identical to `p` -- callers may compare by value (this crate
/// has no reference-identity story for `&str`/`String`, so "same
/// identity" here means "an input equal to its own normalization is a
/// no-op you can skip re-running").
pub fn normalize(p: &str) -> String {
    let rooted = is_rooted(p);
    let mut out: Vec<&str> = Vec::new();

    for segment in p.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if out.last().is_some_and(|&s| s != "..") {
                    out.pop();
                } else if !rooted {
                    out.push("..");
                }
                // Rooted paths silently discard a `..` that would
                // climb above the root, matching POSIX `..`-at-root.
            }
            seg => out.push(seg),
        }
    }

    let body = out.join("/");
    let result = if rooted {
        format!("/{body}")
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    };

    if result == p { p.to_string() } else { result }
}

/// Joins `a` and `b`. If `b` is absolute, `b` is returned verbatim;
/// otherwise the two are concatenated with exactly one `/` between.
pub fn combine(a: &str, b: &str) -> String {
    if is_rooted(b) {
        return b.to_string();
    }
    if a.is_empty() {
        return b.to_string();
    }
    if b.is_empty() {
        return a.to_string();
    }
    if a.ends_with('/') {
        format!("{a}{b}")
    } else {
        format!("{a}/{b}")
    }
}

/// The directory portion of `p` (everything before the last `/`), or
/// `""` if `p` has no `/`.
pub fn directory_name(p: &str) -> &str {
    match p.rfind('/') {
        Some(0) => "/",
        Some(i) => &p[..i],
        None => "",
    }
}

/// The final path component of `p`.
pub fn file_name(p: &str) -> &str {
    match p.rfind('/') {
        Some(i) => &p[i + 1..],
        None => p,
    }
}

/// The extension of `p`'s file name (the part after the last `.`,
/// excluding the dot itself), or `""` if there is none. A leading dot
/// with no further `.` (a dotfile like `.bashrc`) has no extension.
pub fn extension(p: &str) -> &str {
    let name = file_name(p);
    match name.rfind('.') {
        Some(0) => "",
        Some(i) => &name[i + 1..],
        None => "",
    }
}

/// Splits a path into its `/`-separated components, rejecting NUL
/// bytes and paths deeper than 2048 segments (§4.7's traversal cap).
pub fn split_components(p: &str) -> Result<Vec<&str>, Error> {
    validate(p)?;
    let segments: Vec<&str> =
        p.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    if segments.len() > 2048 {
        return Err(UsageError::PathTooDeep.into());
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dots_and_slashes() {
        assert_eq!(normalize("a/./b//c"), "a/b/c");
        assert_eq!(normalize("a/../b"), "b");
        assert_eq!(normalize("a/../../b"), "../b");
        assert_eq!(normalize("/a/../../b"), "/b");
        assert_eq!(normalize(""), ".");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("."), ".");
        assert_eq!(normalize("a/.."), ".");
    }

    #[test]
    fn normalize_is_idempotent() {
        for p in ["a/b/c", "../a", "/a/b", ".", "/", "a/../../b"] {
            let once = normalize(p);
            let twice = normalize(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_preserves_identity_when_already_normal() {
        assert_eq!(normalize("a/b/c"), "a/b/c");
        assert_eq!(normalize("/a/b"), "/a/b");
    }

    #[test]
    fn combine_replaces_on_absolute_rhs() {
        assert_eq!(combine("/a/b", "/c"), "/c");
        assert_eq!(combine("/a/b", "c"), "/a/b/c");
        assert_eq!(combine("/a/b/", "c"), "/a/b/c");
    }

    #[test]
    fn split_components_caps_depth() {
        let deep = "a/".repeat(2049);
        assert!(split_components(&deep).is_err());
        let ok = "a/".repeat(2048);
        assert!(split_components(&ok).is_ok());
    }

    #[test]
    fn name_splitting() {
        assert_eq!(directory_name("/a/b/c"), "/a/b");
        assert_eq!(directory_name("a"), "");
        assert_eq!(file_name("/a/b/c"), "c");
        assert_eq!(extension("a/b/c.txt"), "txt");
        assert_eq!(extension("a/.bashrc"), "");
        assert_eq!(extension("a/b"), "");
    }
}
