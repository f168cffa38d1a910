//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Predefined layout maps
//

use crate::layout_map;
use crate::query::LayoutMap;

layout_map! {
    /// The nested `test_t` record of testdata/test.c.
    pub struct FixtureLayout {
        size: sizeof("test_t"),
        a: offsetof("test_t.a"),
        b: offsetof("test_t.b"),
        nested_size: sizeof("test_t.nested"),
        nested_a: offsetof("test_t.nested.nested_a"),
        nested_b: offsetof("test_t.nested.nested_b"),
        deeply_nested_size: sizeof("test_t.nested.deeply_nested"),
        deeply_nested_a: offsetof("test_t.nested.deeply_nested.deeply_nested_a"),
        deeply_nested_b: offsetof("test_t.nested.deeply_nested.deeply_nested_b"),
    }
}

layout_map! {
    /// Thread-specific data in glibc's `struct pthread`.
    pub struct GlibcLayout {
        pthread_specific_1stblock: offsetof("pthread.specific_1stblock"),
        pthread_size: sizeof("pthread"),
        pthread_key_data: offsetof("pthread_key_data.data"),
        pthread_key_data_size: sizeof("pthread_key_data"),
    }
}

layout_map! {
    /// Thread-specific data in musl's `struct __pthread`.
    pub struct MuslLayout {
        pthread_size: sizeof("__pthread"),
        pthread_tsd: offsetof("__pthread.tsd"),
    }
}

pub const RUNTIMES: &[&str] = &["fixture", "glibc", "musl"];

/// Layout map for `runtime`.  The maps do not vary by version yet; the
/// version is accepted so callers need not change when one does.
pub fn layout_map_for(runtime: &str, _version: &str) -> Option<Box<dyn LayoutMap>> {
    match runtime {
        "fixture" => Some(Box::<FixtureLayout>::default()),
        "glibc" => Some(Box::<GlibcLayout>::default()),
        "musl" => Some(Box::<MuslLayout>::default()),
        _ => None,
    }
}
