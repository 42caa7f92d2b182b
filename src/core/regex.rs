//! `Regex`: the public facade tying `parser` -> `compiler` -> `matcher`
//! together behind a single owning type that compiles a pattern once
//! and routes repeated searches through it.

use std::ops::Range;

use log::debug;

use crate::core::compiler::{self, Program};
use crate::core::error::Error;
use crate::core::matcher::{self, DEFAULT_ITERATION_BUDGET};
use crate::core::parser;

/// Options controlling both compilation and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub case_insensitive: bool,
    pub multiline: bool,
    pub dot_matches_line_separators: bool,
    /// Per-search iteration ceiling, exposed so a caller (or the CLI's
    /// configuration file) can tune it instead of being stuck with
    /// `DEFAULT_ITERATION_BUDGET`.
    pub iteration_budget: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            case_insensitive: false,
            multiline: false,
            dot_matches_line_separators: false,
            iteration_budget: DEFAULT_ITERATION_BUDGET,
        }
    }
}

/// One non-overlapping match: the full matched span plus its capturing
/// groups in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub range: Range<usize>,
    pub text: String,
    pub groups: Vec<Option<Group>>,
}

/// A single capturing group's participation in a `Match`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub range: Range<usize>,
    pub text: String,
}

/// A compiled, reusable regular expression. `ast::Expression` and
/// `compiler::Program` are `Send + Sync` and read-only once built, so a
/// `Regex` may be shared freely across threads; each `is_match`/`matches`
/// call owns its own matcher state.
#[derive(Debug, Clone)]
pub struct Regex {
    program: Program,
    options: Options,
}

impl Regex {
    /// Compiles `pattern` with default `Options`.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        Regex::with_options(pattern, Options::default())
    }

    /// Compiles `pattern` under the given `Options`.
    pub fn with_options(pattern: &str, options: Options) -> Result<Regex, Error> {
        let ast = parser::parse(pattern)?;
        let group_count = parser::capturing_group_count(&ast);
        let program = compiler::compile(
            &ast,
            group_count,
            options.case_insensitive,
            options.dot_matches_line_separators,
        )?;

        debug!(
            "compiled regex \"{}\" ({} capturing group(s))",
            pattern, group_count
        );

        Ok(Regex { program, options })
    }

    pub fn capture_group_count(&self) -> usize {
        self.program.group_count()
    }

    /// True iff at least one match exists anywhere in `input`.
    pub fn is_match(&self, input: &str) -> Result<bool, Error> {
        Ok(!self.matches(input)?.is_empty())
    }

    /// All non-overlapping, left-to-right matches in `input`.
    pub fn matches(&self, input: &str) -> Result<Vec<Match>, Error> {
        let chars: Vec<char> = input.chars().collect();
        let raw = matcher::search(
            &self.program,
            input,
            self.options.case_insensitive,
            self.options.multiline,
            self.options.iteration_budget,
        )?;

        Ok(raw
            .into_iter()
            .map(|m| to_match(&chars, m))
            .collect())
    }
}

fn to_match(chars: &[char], raw: matcher::RawMatch) -> Match {
    Match {
        text: substring(chars, &raw.range),
        range: raw.range,
        groups: raw
            .captures
            .into_iter()
            .map(|maybe_range| {
                maybe_range.map(|range| Group {
                    text: substring(chars, &range),
                    range,
                })
            })
            .collect(),
    }
}

fn substring(chars: &[char], range: &Range<usize>) -> String {
    chars[range.start.min(chars.len())..range.end.min(chars.len())]
        .iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_match_true_for_present_pattern() {
        let regex = Regex::new("a+b").unwrap();
        assert!(regex.is_match("xxabby").unwrap());
    }

    #[test]
    fn matches_reports_text_and_range() {
        let regex = Regex::new("(a|b)+").unwrap();
        let results = regex.matches("abba").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "abba");
        assert_eq!(results[0].range, 0..4);
        assert_eq!(results[0].groups[0].as_ref().unwrap().text, "a");
    }

    #[test]
    fn capture_group_count_reflects_pattern() {
        let regex = Regex::new("(a)(b(c))").unwrap();
        assert_eq!(regex.capture_group_count(), 3);
    }

    #[test]
    fn nested_groups_number_outer_before_inner() {
        let regex = Regex::new("(a(b))").unwrap();
        let results = regex.matches("ab").unwrap();
        assert_eq!(results[0].groups[0].as_ref().unwrap().text, "ab");
        assert_eq!(results[0].groups[1].as_ref().unwrap().text, "b");
    }

    #[test]
    fn malformed_pattern_raises_compile_error() {
        let err = Regex::new("a(b").unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[test]
    fn out_of_range_backreference_raises_engine_error() {
        let err = Regex::new(r"a\2").unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }

    #[test]
    fn case_insensitive_option_is_applied() {
        let options = Options {
            case_insensitive: true,
            ..Options::default()
        };
        let regex = Regex::with_options("hello", options).unwrap();
        assert!(regex.is_match("HELLO").unwrap());
    }

    #[test]
    fn dot_matches_line_separators_option_is_applied() {
        let options = Options {
            dot_matches_line_separators: true,
            ..Options::default()
        };
        let regex = Regex::with_options(".", options).unwrap();
        let results = regex.matches("a\nb").unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn iteration_budget_can_be_tightened() {
        let options = Options {
            iteration_budget: 10,
            ..Options::default()
        };
        let regex = Regex::with_options("(a*)*b", options).unwrap();
        let err = regex.matches(&"a".repeat(30)).unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }
}
