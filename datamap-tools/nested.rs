//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Layout fixture: fills a three level nested record and prints it.
// structlayout -r fixture reads the record's layout back from this
// program's own debug information.
//

#![allow(non_camel_case_types)]

#[repr(C)]
#[derive(Debug, Default)]
struct deeply_nested_t {
    deeply_nested_a: i32,
    deeply_nested_b: i32,
}

#[repr(C)]
#[derive(Debug, Default)]
struct nested_t {
    nested_a: i32,
    nested_b: i32,
    deeply_nested: deeply_nested_t,
}

#[repr(C)]
#[derive(Debug, Default)]
struct test_t {
    a: i32,
    b: i32,
    nested: nested_t,
}

fn main() {
    let mut t = test_t::default();
    t.a = 1;
    t.b = 2;
    t.nested.nested_a = 3;
    t.nested.nested_b = 4;
    t.nested.deeply_nested.deeply_nested_a = 5;
    t.nested.deeply_nested.deeply_nested_b = 6;

    println!("t.a: {}", t.a);
    println!("t.b: {}", t.b);
    println!("t.nested.nested_a: {}", t.nested.nested_a);
    println!("t.nested.nested_b: {}", t.nested.nested_b);
    println!(
        "t.nested.deeply_nested.deeply_nested_a: {}",
        t.nested.deeply_nested.deeply_nested_a
    );
    println!(
        "t.nested.deeply_nested.deeply_nested_b: {}",
        t.nested.deeply_nested.deeply_nested_b
    );
    println!("done");
}
