// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn vars(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

#[test]
fn substitutes_known_keys() {
    let out = render("Provides: [% NAME %]", &vars(&[("NAME", "myapp")]));
    assert_eq!(out, "Provides: myapp");
}

#[test]
fn tolerates_padding_inside_markers() {
    let out = render("[%NAME%] and [%  NAME  %]", &vars(&[("NAME", "x")]));
    assert_eq!(out, "x and x");
}

#[test]
fn leaves_unknown_keys_in_place() {
    let out = render("[% NAME %] [% MISSING %]", &vars(&[("NAME", "x")]));
    assert_eq!(out, "x [% MISSING %]");
}

#[test]
fn substitutes_multiline_values() {
    let out = render(
        "#!/bin/sh\n[% BLOCK %]\nexit 0\n",
        &vars(&[("BLOCK", "a\nb")]),
    );
    assert_eq!(out, "#!/bin/sh\na\nb\nexit 0\n");
}

#[test]
fn empty_value_erases_the_placeholder() {
    let out = render("x[% GONE %]y", &vars(&[("GONE", "")]));
    assert_eq!(out, "xy");
}

#[test]
fn lowercase_markers_are_not_keys() {
    let out = render("[% name %]", &vars(&[("NAME", "x")]));
    assert_eq!(out, "[% name %]");
}
