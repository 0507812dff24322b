// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shell-style glob matching for [`super::SearchOption`] patterns:
//! `*` matches any run of bytes (including none), `?` matches exactly
//! one byte. No character classes, no `**`, no escaping -- spec.md
//! §4.7 asks only for "shell-style glob semantics (`*`, `?`)".

/// Whether `name` matches `pattern` in full.
pub fn matches(pattern: &str, name: &str) -> bool {
    matches_bytes(pattern.as_bytes(), name.as_bytes())
}

fn matches_bytes(pattern: &[u8], name: &[u8]) -> bool {
    match pattern.first() {
        None => name.is_empty(),
        Some(b'*') => {
            matches_bytes(&pattern[1..], name)
                || (!name.is_empty() && matches_bytes(pattern, &name[1..]))
        }
        Some(b'?') => !name.is_empty() && matches_bytes(&pattern[1..], &name[1..]),
        Some(&c) => name.first() == Some(&c) && matches_bytes(&pattern[1..], &name[1..]),
    }
}
