//! Backtracking matcher: walks a compiled `compiler::Program` against an
//! input string, producing non-overlapping matches in left-to-right
//! order with capture tracking and memoization.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use log::trace;

use crate::core::compiler::{Program, Transition, TransitionKind};
use crate::core::data::arena::Handle;
use crate::core::error::EngineError;

/// Default iteration ceiling for one `search` call, protecting against
/// pathological patterns/inputs. Not a mandated value — chosen
/// generously enough to accommodate realistic patterns while still
/// bounding runaway backtracking. Configurable via `Options`/the CLI
/// config file (see DESIGN.md).
pub const DEFAULT_ITERATION_BUDGET: usize = 1_000_000;

/// A completed match, in char-index space (not byte offsets — the
/// engine operates entirely over `Vec<char>`, so ranges here are char
/// counts into the input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub range: Range<usize>,
    /// Indexed by `group - 1`; `None` for a capturing group that never
    /// participated in this match.
    pub captures: Vec<Option<Range<usize>>>,
}

/// Per-branch matcher state: the start index at which each capturing
/// group currently open (or most recently opened) along this
/// traversal path began. Part of the memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
struct Context {
    starts: Vec<Option<usize>>,
}

impl Context {
    fn new(group_count: usize) -> Self {
        Context {
            starts: vec![None; group_count],
        }
    }

    fn start_of(&self, group: usize) -> Option<usize> {
        self.starts.get(group.wrapping_sub(1)).copied().flatten()
    }

    fn set_start(&mut self, group: usize, index: usize) {
        if let Some(slot) = self.starts.get_mut(group.wrapping_sub(1)) {
            *slot = Some(index);
        }
    }
}

#[derive(Debug, Clone)]
struct IntermediateMatch {
    end_index: usize,
    captures: Vec<(usize, Range<usize>)>,
}

type CacheKey = (usize, Handle, Context);

struct Matcher<'a> {
    program: &'a Program,
    chars: &'a [char],
    /// Scratch table recording, for each group, the char index at which
    /// the traversal most recently passed through that group's closing
    /// state. Cleared per-group as soon as it is consumed by the owning
    /// group-start frame, so a quantified group's earlier iterations
    /// cannot leak into the capture emitted by its last one.
    closing_positions: HashMap<usize, usize>,
    iteration_count: usize,
    iteration_limit: usize,
}

impl<'a> Matcher<'a> {
    fn tick(&mut self) -> Result<(), EngineError> {
        self.iteration_count += 1;
        if self.iteration_count > self.iteration_limit {
            return Err(EngineError::IterationBudgetExceeded {
                limit: self.iteration_limit,
            });
        }
        Ok(())
    }

    /// Depth-first traversal of the state graph from `state`.
    fn match_state(
        &mut self,
        state: Handle,
        index: usize,
        context: &Context,
        cache: &mut HashSet<CacheKey>,
    ) -> Result<Option<IntermediateMatch>, EngineError> {
        self.tick()?;

        if let Some(group) = self.program.closing_group(state) {
            self.closing_positions.insert(group, index);
        }

        let node = self.program.state(state);

        if node.is_end {
            return Ok(Some(IntermediateMatch {
                end_index: index,
                captures: Vec::new(),
            }));
        }

        let key = (index, state, context.clone());
        if cache.contains(&key) {
            return Ok(None);
        }

        for transition in &node.transitions {
            let Some((consumed, next_context)) = self.try_transition(transition, index, context)
            else {
                continue;
            };

            let next_index = index + consumed;
            let outcome = self.match_state(transition.target, next_index, &next_context, cache)?;

            if let Some(mut result) = outcome {
                if let Some(group) = node.group_start {
                    if let Some(end_index) = self.closing_positions.remove(&group) {
                        let start_index = context.start_of(group).unwrap_or(index);
                        result.captures.push((group, start_index..end_index));
                    }
                }
                return Ok(Some(result));
            }
        }

        cache.insert(key);
        Ok(None)
    }

    /// Evaluates one transition's condition and, if it matches, returns
    /// how many characters it consumes plus the context to recurse
    /// with (updated with a fresh group start if the target is tagged
    /// as one).
    fn try_transition(
        &self,
        transition: &Transition,
        index: usize,
        context: &Context,
    ) -> Option<(usize, Context)> {
        let consumed = match &transition.kind {
            TransitionKind::Epsilon => 0,
            TransitionKind::StartAnchor => {
                if index == 0 {
                    0
                } else {
                    return None;
                }
            }
            TransitionKind::Char(test) => {
                let c = *self.chars.get(index)?;
                if test.matches(c) {
                    1
                } else {
                    return None;
                }
            }
            TransitionKind::Backreference(group) => self.backreference_len(*group, index, context)?,
        };

        let mut next_context = context.clone();
        if let Some(group) = self.program.state(transition.target).group_start {
            next_context.set_start(group, index + consumed);
        }

        Some((consumed, next_context))
    }

    /// Length, in characters, of the literal text previously captured
    /// by `group`, if it matches the input starting at `index`; `None`
    /// if the group has not yet captured anything along this path (the
    /// transition fails outright) or the input doesn't match.
    fn backreference_len(&self, group: usize, index: usize, context: &Context) -> Option<usize> {
        let start = context.start_of(group)?;
        let end = *self.closing_positions.get(&group)?;
        if end < start {
            return None;
        }
        let len = end - start;
        if index + len > self.chars.len() {
            return None;
        }
        if self.chars[index..index + len] == self.chars[start..end] {
            Some(len)
        } else {
            None
        }
    }
}

/// Runs the outer search loop over one window: try every start index
/// from 0 to `window.len()` inclusive, with a fresh
/// memoization cache and empty context each time; on success advance
/// past the match (by at least one character to avoid looping forever
/// on zero-length matches).
///
/// The iteration budget is shared across every start-index attempt in
/// this window (not reset per attempt) *and* across every window of the
/// same `search` call via `iteration_count`, so one `search` call can
/// never exceed it regardless of how many start positions or lines it
/// tries — only the memoization cache is scoped to one search attempt,
/// so this is a deliberate implementation choice, recorded in
/// DESIGN.md.
fn search_window(
    program: &Program,
    window: &[char],
    iteration_budget: usize,
    iteration_count: &mut usize,
) -> Result<Vec<RawMatch>, EngineError> {
    let mut results = Vec::new();
    let mut i = 0usize;

    while i <= window.len() {
        let mut matcher = Matcher {
            program,
            chars: window,
            closing_positions: HashMap::new(),
            iteration_count: *iteration_count,
            iteration_limit: iteration_budget,
        };
        let context = Context::new(program.group_count());
        let mut cache = HashSet::new();

        let outcome = matcher.match_state(program.start(), i, &context, &mut cache)?;
        *iteration_count = matcher.iteration_count;

        match outcome {
            Some(intermediate) => {
                let mut captures = vec![None; program.group_count()];
                for (group, range) in intermediate.captures {
                    if group >= 1 && group <= captures.len() {
                        captures[group - 1] = Some(range);
                    }
                }

                let end = intermediate.end_index;
                results.push(RawMatch { range: i..end, captures });
                i = if end > i { end } else { i + 1 };
            }
            None => i += 1,
        }
    }

    Ok(results)
}

/// Preprocesses `input` (case-folding, then splitting into windows on
/// `\n` if `multiline`) and runs the outer search loop over each window
/// independently, translating each window's local match offsets back
/// into the coordinates of the full input.
pub fn search(
    program: &Program,
    input: &str,
    case_insensitive: bool,
    multiline: bool,
    iteration_budget: usize,
) -> Result<Vec<RawMatch>, EngineError> {
    let folded: Vec<char> = input
        .chars()
        .map(|c| {
            if case_insensitive {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                c
            }
        })
        .collect();

    let mut matches = Vec::new();
    let mut iteration_count = 0usize;

    if multiline {
        let mut window_start = 0usize;
        for window in folded.split(|&c| c == '\n') {
            let window_matches =
                search_window(program, window, iteration_budget, &mut iteration_count)?;
            for m in window_matches {
                matches.push(RawMatch {
                    range: (m.range.start + window_start)..(m.range.end + window_start),
                    captures: m
                        .captures
                        .into_iter()
                        .map(|c| c.map(|r| (r.start + window_start)..(r.end + window_start)))
                        .collect(),
                });
            }
            // +1 skips the '\n' separator consumed by `split`.
            window_start += window.len() + 1;
        }
    } else {
        matches = search_window(program, &folded, iteration_budget, &mut iteration_count)?;
    }

    trace!(
        "search over {} char(s) ({} window(s)) produced {} match(es)",
        folded.len(),
        if multiline { folded.iter().filter(|&&c| c == '\n').count() + 1 } else { 1 },
        matches.len()
    );

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{compiler, parser};

    fn compile(pattern: &str) -> Program {
        let ast = parser::parse(pattern).unwrap();
        let group_count = parser::capturing_group_count(&ast);
        compiler::compile(&ast, group_count, false, false).unwrap()
    }

    fn matches(pattern: &str, input: &str) -> Vec<RawMatch> {
        let program = compile(pattern);
        search(&program, input, false, false, DEFAULT_ITERATION_BUDGET).unwrap()
    }

    fn ranges(pattern: &str, input: &str) -> Vec<Range<usize>> {
        matches(pattern, input).into_iter().map(|m| m.range).collect()
    }

    #[test]
    fn star_on_empty_string_matches_once_at_zero() {
        assert_eq!(ranges("a*", ""), vec![0..0]);
    }

    #[test]
    fn star_produces_three_matches() {
        assert_eq!(ranges("a*", "aaab"), vec![0..3, 3..3, 4..4]);
    }

    #[test]
    fn alternation_loop_keeps_last_capture() {
        let results = matches("(a|b)+", "abba");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].range, 0..4);
        assert_eq!(results[0].captures[0], Some(3..4));
    }

    #[test]
    fn start_anchor_without_multiline_matches_once() {
        assert_eq!(ranges("^foo", "foo\nfoo"), vec![0..3]);
    }

    #[test]
    fn start_anchor_with_multiline_matches_each_line() {
        let program = compile("^foo");
        let results = search(&program, "foo\nfoo", false, true, DEFAULT_ITERATION_BUDGET).unwrap();
        let ranges: Vec<_> = results.into_iter().map(|m| m.range).collect();
        assert_eq!(ranges, vec![0..3, 4..7]);
    }

    #[test]
    fn backreference_matches_repeated_group() {
        let results = matches(r"(ab)\1", "abab");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].range, 0..4);
        assert_eq!(results[0].captures[0], Some(0..2));
    }

    #[test]
    fn lazy_bounded_quantifier_takes_minimum() {
        assert_eq!(ranges("a{2,3}?", "aaaa"), vec![0..2, 2..4]);
    }

    #[test]
    fn negated_digit_class_matches_letters_runs() {
        assert_eq!(ranges(r"[^\d]+", "12ab34cd"), vec![2..4, 6..8]);
    }

    #[test]
    fn dot_excludes_newline_without_option() {
        let program = compile(".");
        let results = search(&program, "a\nb", false, false, DEFAULT_ITERATION_BUDGET).unwrap();
        let ranges: Vec<_> = results.into_iter().map(|m| m.range).collect();
        assert_eq!(ranges, vec![0..1, 2..3]);
    }

    #[test]
    fn dot_matches_newline_with_option() {
        let ast = parser::parse(".").unwrap();
        let program = compiler::compile(&ast, 0, false, true).unwrap();
        let results = search(&program, "a\nb", false, false, DEFAULT_ITERATION_BUDGET).unwrap();
        let ranges: Vec<_> = results.into_iter().map(|m| m.range).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn iteration_budget_is_enforced() {
        let program = compile("(a*)*b");
        let err = search(&program, &"a".repeat(50), false, false, 50).unwrap_err();
        assert_eq!(err, EngineError::IterationBudgetExceeded { limit: 50 });
    }

    /// Matching a single "a" window against pattern "a" costs exactly 3
    /// ticks: one for the entry state (consumes the char), one for the
    /// exit state (is_end, completes the match), one more trying (and
    /// failing) to start a second match at index 1. A budget of 3 lets
    /// that one line through with nothing to spare, so a second,
    /// identical line must push the running count over the same
    /// budget — proving the count is carried across windows rather
    /// than reset per line.
    #[test]
    fn iteration_budget_is_shared_across_multiline_windows() {
        let program = compile("a");
        let budget = 3;

        assert!(search(&program, "a", false, false, budget).is_ok());

        let err = search(&program, "a\na", false, true, budget).unwrap_err();
        assert_eq!(err, EngineError::IterationBudgetExceeded { limit: budget });
    }

    #[test]
    fn case_insensitive_option_folds_input() {
        let program = compile("abc");
        let results = search(&program, "ABC", true, false, DEFAULT_ITERATION_BUDGET).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].range, 0..3);
    }
}
