//! End-to-end tests against the public `Regex` facade: each case sets
//! up a pattern and input, exercises the public API, then verifies the
//! result, rather than duplicating `core::matcher`'s unit-level coverage.

use rex::{Error, Options, Regex};

#[test]
fn test_literal_concatenation() {
    let re = Regex::new("abc").unwrap();

    let found = re.matches("xxabcxx").unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "abc");
    assert_eq!(found[0].range, 2..5);
}

#[test]
fn test_alternation_prefers_left_to_right_leftmost_match() {
    let re = Regex::new("cat|catalog").unwrap();

    let found = re.matches("catalog").unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "cat");
}

#[test]
fn test_quantified_capturing_group_keeps_last_iteration() {
    let re = Regex::new("(a|b)+").unwrap();

    let found = re.matches("abba").unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "abba");
    assert_eq!(found[0].groups[0].as_ref().unwrap().text, "a");
}

#[test]
fn test_lazy_quantifier_stops_as_early_as_possible() {
    let re = Regex::new("a{2,3}?").unwrap();

    let found = re.matches("aaaa").unwrap();
    let ranges: Vec<_> = found.iter().map(|m| m.range.clone()).collect();

    assert_eq!(ranges, vec![0..2, 2..4]);
}

#[test]
fn test_backreference_requires_matching_prior_capture() {
    let re = Regex::new(r"(\w+) \1").unwrap();

    assert!(re.is_match("hello hello").unwrap());
    assert!(!re.is_match("hello world").unwrap());
}

#[test]
fn test_case_insensitive_option_applies_to_whole_search() {
    let re = Regex::with_options(
        "hello",
        Options {
            case_insensitive: true,
            ..Options::default()
        },
    )
    .unwrap();

    assert!(re.is_match("HELLO WORLD").unwrap());
}

#[test]
fn test_multiline_anchors_start_of_each_line() {
    let re = Regex::with_options(
        "^b",
        Options {
            multiline: true,
            ..Options::default()
        },
    )
    .unwrap();

    let found = re.matches("a\nb\nc").unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].range, 2..3);
}

#[test]
fn test_malformed_pattern_reports_compile_error_with_marker() {
    let err = Regex::new("a(b").unwrap_err();

    let rendered = err.render();
    match err {
        Error::Compile(_) => assert!(rendered.contains('\u{1F4A5}')),
        Error::Engine(_) => panic!("expected a compile error for an unbalanced group"),
    }
}

#[test]
fn test_runaway_quantifier_is_stopped_by_the_iteration_budget() {
    let re = Regex::with_options(
        "(a*)*b",
        Options {
            iteration_budget: 500,
            ..Options::default()
        },
    )
    .unwrap();

    let err = re.matches(&"a".repeat(100)).unwrap_err();

    assert!(matches!(err, Error::Engine(_)));
}
