// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property tests for the hex codec, path normalization, and the
//! filesystem's nlink invariants under random mutation sequences.

use cpiofs::fs::Content;
use cpiofs::hex::{format_u32, parse_u32_hex};
use cpiofs::path;
use cpiofs::Filesystem;
use proptest::prelude::*;

proptest! {
    #[test]
    fn hex_format_round_trips_through_parse(v: u32) {
        let text = format_u32(v);
        let (parsed, ok) = parse_u32_hex(&text);
        prop_assert!(ok);
        prop_assert_eq!(parsed, v);
    }

    #[test]
    fn hex_parse_rejects_any_non_hex_byte(
        mut bytes in prop::array::uniform8(any::<u8>()),
        bad_index in 0usize..8,
    ) {
        // Force one byte outside 0-9A-Fa-f, keep the rest arbitrary.
        bytes[bad_index] = b'G';
        let (_, ok) = parse_u32_hex(&bytes);
        prop_assert!(!ok);
    }

    #[test]
    fn path_normalize_is_idempotent(p in "(/?([a-z0-9]{1,4}|\\.{1,2})(/([a-z0-9]{1,4}|\\.{1,2})){0,6})") {
        let once = path::normalize(&p);
        let twice = path::normalize(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn path_normalize_preserves_identity_of_already_normal_input(
        segments in prop::collection::vec("[a-z0-9]{1,6}", 0..6),
        rooted in any::<bool>(),
    ) {
        let body = segments.join("/");
        let p = if rooted { format!("/{body}") } else if body.is_empty() { ".".to_string() } else { body };
        let normalized = path::normalize(&p);
        prop_assert_eq!(normalized, p);
    }
}

#[derive(Clone, Debug)]
enum Op {
    CreateFile(String),
    CreateDir(String),
    HardLink(String, String),
    Delete(String),
    Move(String, String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let name = "[a-c]";
    prop_oneof![
        name.prop_map(|n| Op::CreateFile(n.to_string())),
        name.prop_map(|n| Op::CreateDir(n.to_string())),
        (name, name).prop_map(|(a, b)| Op::HardLink(a.to_string(), b.to_string())),
        name.prop_map(|n| Op::Delete(n.to_string())),
        (name, name).prop_map(|(a, b)| Op::Move(a.to_string(), b.to_string())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn nlink_invariants_hold_after_random_mutations(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut fs = Filesystem::new();
        let root = fs.root();

        for op in ops {
            match op {
                Op::CreateFile(name) => {
                    let _ = fs.create_file(root, &name, Some(Content::from_bytes(b"x".to_vec())), false);
                }
                Op::CreateDir(name) => {
                    let _ = fs.create_directory(root, &name, false);
                }
                Op::HardLink(src, dst) => {
                    if let Some(existing) = fs.try_get(root, &src) {
                        let _ = fs.create_hard_link(root, &dst, existing);
                    }
                }
                Op::Delete(name) => {
                    let _ = fs.delete(root, &name);
                }
                Op::Move(src, dst) => {
                    let _ = fs.mv(root, &src, &dst, false, true);
                }
            }
            fs.check_nlink_invariants().unwrap();
            prop_assert!(fs.all_reachable());
        }
    }
}
