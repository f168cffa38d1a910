//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use plib::testing::{run_test, TestPlan};

#[test]
fn test_nested_output() {
    run_test(TestPlan {
        cmd: String::from("nested"),
        args: Vec::new(),
        stdin_data: String::new(),
        expected_out: String::from(
            "t.a: 1\n\
             t.b: 2\n\
             t.nested.nested_a: 3\n\
             t.nested.nested_b: 4\n\
             t.nested.deeply_nested.deeply_nested_a: 5\n\
             t.nested.deeply_nested.deeply_nested_b: 6\n\
             done\n",
        ),
        expected_err: String::new(),
        expected_exit_code: 0,
    });
}

#[test]
fn test_nested_ignores_stdin() {
    run_test_with_stdin("ignored input\n");
}

fn run_test_with_stdin(stdin: &str) {
    let mut plan = TestPlan::new("nested", &[]);
    plan.stdin_data = stdin.to_string();
    plib::testing::run_test_with_checker(plan, |_, output| {
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.lines().count(), 7);
        assert_eq!(stdout.lines().last(), Some("done"));
    });
}
