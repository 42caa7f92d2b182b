//! AST -> NFA compiler. Lowers `core::ast::Ast` into a `Program`: an
//! arena of states connected by epsilon and character-consuming
//! transitions, built by composing entry/exit subgraph fragments
//! (Thompson-style construction) bottom-up over the AST.

use std::{error, fmt};

use log::trace;

use crate::core::ast::{
    Ast, CharacterGroupItem, ClassKind, Expression, ExpressionItem, Group, Match, MatchItem,
    QuantifierKind,
};
use crate::core::data::arena::{Arena, Handle};
use crate::core::data::interval::{Interval, IntervalSet};

/// Error: a compiler failure. Syntactically well-formed patterns can
/// still fail to compile if a backreference targets a capturing group
/// that does not exist in the AST — surfaced as an engine error, not a
/// compile error, despite the check happening here.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    BackreferenceOutOfRange { group: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::BackreferenceOutOfRange { group } => {
                write!(f, "backreference to non-existent group {}", group)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

/// A single outgoing edge from a `StateNode`.
#[derive(Clone, Debug)]
pub struct Transition {
    pub kind: TransitionKind,
    pub target: Handle,
}

impl Transition {
    pub fn is_epsilon(&self) -> bool {
        !matches!(
            self.kind,
            TransitionKind::Char(_) | TransitionKind::Backreference(_)
        )
    }
}

#[derive(Clone, Debug)]
pub enum TransitionKind {
    /// Unconditional, non-consuming.
    Epsilon,
    /// True only when the cursor sits at the start of the current
    /// search window.
    StartAnchor,
    /// Consumes exactly one character satisfying `CharTest`.
    Char(CharTest),
    /// Consumes the literal text previously captured by group `usize`,
    /// or matches the empty string if that group has not yet captured
    /// anything.
    Backreference(usize),
}

/// The condition tested by a character-consuming `Transition`. Case-
/// folding is applied by the compiler at build time (lowering
/// literal/set characters) rather than at match time — the input is
/// lowercased once during matcher preprocessing, so by match time both
/// sides of every comparison are already folded.
#[derive(Clone, Debug)]
pub enum CharTest {
    Any { matches_line_separators: bool },
    Literal(char),
    Class(ClassKind),
    UnicodeCategory(fn(char) -> bool),
    Set(CharSet),
}

impl CharTest {
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharTest::Any {
                matches_line_separators,
            } => *matches_line_separators || c != '\n',
            CharTest::Literal(expected) => *expected == c,
            CharTest::Class(kind) => class_matches(*kind, c),
            CharTest::UnicodeCategory(predicate) => predicate(c),
            CharTest::Set(set) => set.matches(c),
        }
    }
}

/// `[set]` / `[^set]`: a union of single characters, ranges, classes
/// and Unicode categories, optionally negated.
#[derive(Clone, Debug, Default)]
pub struct CharSet {
    pub negated: bool,
    pub chars: IntervalSet,
    pub classes: Vec<ClassKind>,
    pub categories: Vec<fn(char) -> bool>,
}

impl CharSet {
    pub fn matches(&self, c: char) -> bool {
        let member = self.chars.contains(c)
            || self.classes.iter().any(|kind| class_matches(*kind, c))
            || self.categories.iter().any(|predicate| predicate(c));

        member != self.negated
    }
}

fn class_matches(kind: ClassKind, c: char) -> bool {
    match kind {
        ClassKind::Word => c.is_alphanumeric() || c == '_',
        ClassKind::NonWord => !(c.is_alphanumeric() || c == '_'),
        ClassKind::Digit => c.is_ascii_digit(),
        ClassKind::NonDigit => !c.is_ascii_digit(),
    }
}

/// Resolves a `\p{Name}` category name to a membership predicate.
/// Rust's standard library has no general Unicode-category table, so
/// these are approximations built from `char`'s own classification
/// methods rather than a true Unicode General_Category lookup; common
/// aliases (`L`/`Letter`, `Nd`/`Digit`, ...) are accepted alongside the
/// bare two-letter codes (`Lu`, `Nd`).
pub fn unicode_category_predicate(name: &str) -> Option<fn(char) -> bool> {
    match name {
        "L" | "Letter" => Some(char::is_alphabetic as fn(char) -> bool),
        "Lu" | "Uppercase_Letter" => Some(char::is_uppercase as fn(char) -> bool),
        "Ll" | "Lowercase_Letter" => Some(char::is_lowercase as fn(char) -> bool),
        "N" | "Number" => Some(char::is_numeric as fn(char) -> bool),
        "Nd" | "Decimal_Number" => Some((|c: char| c.is_ascii_digit()) as fn(char) -> bool),
        "Z" | "Separator" | "Zs" | "Space_Separator" => {
            Some(char::is_whitespace as fn(char) -> bool)
        }
        "P" | "Punctuation" => Some((|c: char| c.is_ascii_punctuation()) as fn(char) -> bool),
        "C" | "Control" | "Cc" => Some(char::is_control as fn(char) -> bool),
        _ => None,
    }
}

/// A compiled state: an optional capturing-group-start tag, its
/// outgoing transitions, and whether reaching it ends a match.
#[derive(Clone, Debug, Default)]
pub struct StateNode {
    pub group_start: Option<usize>,
    pub transitions: Vec<Transition>,
    pub is_end: bool,
}

/// `Program`: the compiled, immutable state graph for one pattern.
/// Shared freely across threads.
#[derive(Clone, Debug)]
pub struct Program {
    states: Arena<StateNode>,
    start: Handle,
    /// Maps a group's closing state to the group number it closes,
    /// populated while wrapping each `Group` subgraph.
    closing_states: std::collections::HashMap<Handle, usize>,
    group_count: usize,
}

impl Program {
    pub fn start(&self) -> Handle {
        self.start
    }

    pub fn state(&self, handle: Handle) -> &StateNode {
        self.states.get(handle)
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn closing_group(&self, handle: Handle) -> Option<usize> {
        self.closing_states.get(&handle).copied()
    }
}

/// A subgraph with a single entry and single exit state: each AST node
/// produces one such fragment, composed with its children's fragments
/// according to the node's own structure.
#[derive(Clone, Copy, Debug)]
struct Fragment {
    entry: Handle,
    exit: Handle,
}

struct Builder {
    states: Arena<StateNode>,
    closing_states: std::collections::HashMap<Handle, usize>,
    group_counter: usize,
    case_insensitive: bool,
    dot_matches_line_separators: bool,
}

impl Builder {
    fn new(case_insensitive: bool, dot_matches_line_separators: bool) -> Self {
        Builder {
            states: Arena::new(),
            closing_states: std::collections::HashMap::new(),
            group_counter: 0,
            case_insensitive,
            dot_matches_line_separators,
        }
    }

    fn new_state(&mut self) -> Handle {
        self.states.insert(StateNode::default())
    }

    fn add_transition(&mut self, from: Handle, kind: TransitionKind, target: Handle) {
        self.states
            .get_mut(from)
            .transitions
            .push(Transition { kind, target });
    }

    fn epsilon_fragment(&mut self) -> Fragment {
        let entry = self.new_state();
        let exit = self.new_state();
        self.add_transition(entry, TransitionKind::Epsilon, exit);
        Fragment { entry, exit }
    }

    fn compile_expression(&mut self, expr: &Expression) -> Result<Fragment, Error> {
        if expr.items.is_empty() {
            return Ok(self.epsilon_fragment());
        }

        let mut fragments = Vec::with_capacity(expr.items.len());
        for item in &expr.items {
            fragments.push(self.compile_item(item)?);
        }

        let entry = fragments[0].entry;
        let exit = fragments.last().unwrap().exit;
        for pair in fragments.windows(2) {
            self.add_transition(pair[0].exit, TransitionKind::Epsilon, pair[1].entry);
        }

        Ok(Fragment { entry, exit })
    }

    fn compile_item(&mut self, item: &ExpressionItem) -> Result<Fragment, Error> {
        match item {
            ExpressionItem::Match(m) => self.compile_match(m),
            ExpressionItem::Group(group) => self.compile_group(group),
            ExpressionItem::Backreference(group) => self.compile_backreference(*group),
            ExpressionItem::Alternation(left, right) => self.compile_alternation(left, right),
        }
    }

    fn compile_alternation(
        &mut self,
        left: &Expression,
        right: &Expression,
    ) -> Result<Fragment, Error> {
        let left_frag = self.compile_expression(left)?;
        let right_frag = self.compile_expression(right)?;

        let entry = self.new_state();
        let exit = self.new_state();

        // Left branch tried first: it wins when both alternatives could
        // match the same prefix.
        self.add_transition(entry, TransitionKind::Epsilon, left_frag.entry);
        self.add_transition(entry, TransitionKind::Epsilon, right_frag.entry);
        self.add_transition(left_frag.exit, TransitionKind::Epsilon, exit);
        self.add_transition(right_frag.exit, TransitionKind::Epsilon, exit);

        Ok(Fragment { entry, exit })
    }

    fn compile_backreference(&mut self, group: usize) -> Result<Fragment, Error> {
        let entry = self.new_state();
        let exit = self.new_state();
        self.add_transition(entry, TransitionKind::Backreference(group), exit);
        Ok(Fragment { entry, exit })
    }

    fn compile_group(&mut self, group: &Group) -> Result<Fragment, Error> {
        // Numbers are assigned pre-order, before recursing into the
        // group's own contents, so a nested capturing group is numbered
        // after its enclosing group, matching the parser's own
        // pre-order `group_count` increment and the left-to-right by
        // opening-parenthesis convention `\k` backreferences rely on.
        let number = if group.capturing {
            self.group_counter += 1;
            Some(self.group_counter)
        } else {
            None
        };

        let inner = self.compile_expression(&group.inner)?;

        let fragment = if let Some(number) = number {
            self.states.get_mut(inner.entry).group_start = Some(number);
            self.closing_states.insert(inner.exit, number);

            let entry = self.new_state();
            let exit = self.new_state();
            self.add_transition(entry, TransitionKind::Epsilon, inner.entry);
            self.add_transition(inner.exit, TransitionKind::Epsilon, exit);
            Fragment { entry, exit }
        } else {
            inner
        };

        match &group.quantifier {
            Some(quantifier) => self.compile_quantifier(fragment, quantifier.kind, quantifier.lazy),
            None => Ok(fragment),
        }
    }

    fn compile_match(&mut self, m: &Match) -> Result<Fragment, Error> {
        let test = self.match_item_test(&m.item)?;
        let entry = self.new_state();
        let exit = self.new_state();
        self.add_transition(entry, TransitionKind::Char(test), exit);
        let fragment = Fragment { entry, exit };

        match &m.quantifier {
            Some(quantifier) => self.compile_quantifier(fragment, quantifier.kind, quantifier.lazy),
            None => Ok(fragment),
        }
    }

    fn match_item_test(&self, item: &MatchItem) -> Result<CharTest, Error> {
        Ok(match item {
            MatchItem::AnyCharacter => CharTest::Any {
                matches_line_separators: self.dot_matches_line_separators,
            },
            MatchItem::Character(c) => CharTest::Literal(self.fold(*c)),
            MatchItem::CharacterClass(kind) => CharTest::Class(*kind),
            MatchItem::UnicodeCategory(name) => {
                CharTest::UnicodeCategory(category_predicate_or_any(name))
            }
            MatchItem::CharacterGroup { negated, items } => {
                CharTest::Set(self.character_set(*negated, items))
            }
        })
    }

    fn character_set(&self, negated: bool, items: &[CharacterGroupItem]) -> CharSet {
        let mut set = CharSet {
            negated,
            ..CharSet::default()
        };

        for item in items {
            match item {
                CharacterGroupItem::Single(c) => set.chars.insert_char(self.fold(*c)),
                CharacterGroupItem::Range(lo, hi) => {
                    // Ranges were already validated (`lo <= hi`) by the
                    // parser; folding the endpoints individually is a
                    // reasonable approximation of case-insensitive range
                    // membership under the ASCII/locale-insensitive
                    // lowering this crate implements.
                    if let Ok(interval) = Interval::new(self.fold(*lo), self.fold(*hi)) {
                        set.chars.insert_range(interval);
                    } else {
                        set.chars.insert_range(Interval::new(*lo, *hi).unwrap());
                    }
                }
                CharacterGroupItem::Class(kind) => set.classes.push(*kind),
                CharacterGroupItem::UnicodeCategory(name) => {
                    set.categories.push(category_predicate_or_any(name))
                }
            }
        }

        set
    }

    /// Case-folds a single pattern character at compile time: patterns
    /// are lowercased pre-match when case-insensitive. Only the first
    /// code point of `to_lowercase`
    /// is kept; multi-code-point foldings are rare enough for the
    /// single-char atoms this crate compiles that the common case
    /// (ASCII plus most of Latin-1) is unaffected.
    fn fold(&self, c: char) -> char {
        if self.case_insensitive {
            c.to_lowercase().next().unwrap_or(c)
        } else {
            c
        }
    }

    fn compile_quantifier(
        &mut self,
        inner: Fragment,
        kind: QuantifierKind,
        lazy: bool,
    ) -> Result<Fragment, Error> {
        match kind {
            QuantifierKind::ZeroOrMore => Ok(self.star(inner, lazy)),
            QuantifierKind::OneOrMore => Ok(self.plus(inner, lazy)),
            QuantifierKind::ZeroOrOne => Ok(self.optional(inner, lazy)),
            QuantifierKind::Range(lo, hi) => self.range(inner, lo, hi, lazy),
        }
    }

    /// `*` / `*?`: new entry with two epsilon edges, one into the
    /// subgraph and one straight to a new exit; the subgraph's own exit
    /// loops back to the new entry. Laziness flips which edge is tried
    /// first.
    fn star(&mut self, inner: Fragment, lazy: bool) -> Fragment {
        let entry = self.new_state();
        let exit = self.new_state();

        if lazy {
            self.add_transition(entry, TransitionKind::Epsilon, exit);
            self.add_transition(entry, TransitionKind::Epsilon, inner.entry);
        } else {
            self.add_transition(entry, TransitionKind::Epsilon, inner.entry);
            self.add_transition(entry, TransitionKind::Epsilon, exit);
        }
        self.add_transition(inner.exit, TransitionKind::Epsilon, entry);

        Fragment { entry, exit }
    }

    /// `+` / `+?`: one mandatory pass through a fresh copy of the
    /// subgraph, followed by `*` / `*?` of the original.
    fn plus(&mut self, inner: Fragment, lazy: bool) -> Fragment {
        let star = self.star(inner, lazy);
        let entry = self.new_state();
        self.add_transition(entry, TransitionKind::Epsilon, inner.entry);
        self.add_transition(inner.exit, TransitionKind::Epsilon, star.entry);
        Fragment {
            entry,
            exit: star.exit,
        }
    }

    /// `?` / `??`: skip-or-enter, order determined by laziness.
    fn optional(&mut self, inner: Fragment, lazy: bool) -> Fragment {
        let entry = self.new_state();
        let exit = self.new_state();

        if lazy {
            self.add_transition(entry, TransitionKind::Epsilon, exit);
            self.add_transition(entry, TransitionKind::Epsilon, inner.entry);
        } else {
            self.add_transition(entry, TransitionKind::Epsilon, inner.entry);
            self.add_transition(entry, TransitionKind::Epsilon, exit);
        }
        self.add_transition(inner.exit, TransitionKind::Epsilon, exit);

        Fragment { entry, exit }
    }

    /// `{n}` / `{n,}` / `{n,m}`: unroll `lo` mandatory copies, then
    /// either a `*`/`*?` tail (`{n,}`) or `(hi - lo)` chained optional
    /// copies (`{n,m}`), each independently skippable. Every copy after
    /// the first is a structural clone rather than a shared subgraph,
    /// since an unrolled subgraph cannot share states across
    /// repetitions when the repeated item contains capturing groups.
    fn range(
        &mut self,
        first_copy: Fragment,
        lo: usize,
        hi: Option<usize>,
        lazy: bool,
    ) -> Result<Fragment, Error> {
        // `first_copy` is already-compiled copy #1 (if `lo == 0` and
        // there is no mandatory copy, it is instead the seed used to
        // clone further optional copies below).
        if lo == 0 && hi == Some(0) {
            // `{0}` / `{0,0}`: matches the empty string unconditionally.
            return Ok(self.epsilon_fragment());
        }

        let mut copies = Vec::new();
        if lo > 0 {
            copies.push(first_copy);
            for _ in 1..lo {
                copies.push(self.clone_fragment(first_copy));
            }
        }

        let mandatory_exit = if copies.is_empty() {
            None
        } else {
            for pair in copies.windows(2) {
                self.add_transition(pair[0].exit, TransitionKind::Epsilon, pair[1].entry);
            }
            Some(copies.last().unwrap().exit)
        };

        let tail = match hi {
            None => {
                // `{n,}`: mandatory copies followed by `*`/`*?` of G.
                // If there were no mandatory copies (`n == 0`), reuse
                // `first_copy` itself as the looped subgraph.
                let looped = if copies.is_empty() {
                    first_copy
                } else {
                    self.clone_fragment(first_copy)
                };
                Some(self.star(looped, lazy))
            }
            Some(hi) => {
                let optional_count = hi.saturating_sub(lo);
                if optional_count == 0 {
                    None
                } else {
                    let mut optional_fragments = Vec::with_capacity(optional_count);
                    for _ in 0..optional_count {
                        optional_fragments.push(self.clone_fragment(first_copy));
                    }
                    Some(self.chain_optionals(optional_fragments, lazy))
                }
            }
        };

        match (mandatory_exit, tail) {
            (Some(exit_state), Some(tail_frag)) => {
                self.add_transition(exit_state, TransitionKind::Epsilon, tail_frag.entry);
                Ok(Fragment {
                    entry: copies[0].entry,
                    exit: tail_frag.exit,
                })
            }
            (Some(exit_state), None) => Ok(Fragment {
                entry: copies[0].entry,
                exit: exit_state,
            }),
            (None, Some(tail_frag)) => Ok(tail_frag),
            (None, None) => Ok(self.epsilon_fragment()),
        }
    }

    /// Chains a sequence of optional copies of a subgraph, each
    /// independently skippable, so that `{n,m}` can stop after any
    /// number of the `m - n` optional repetitions.
    fn chain_optionals(&mut self, copies: Vec<Fragment>, lazy: bool) -> Fragment {
        let exit = self.new_state();
        let mut entry = exit;

        for copy in copies.into_iter().rev() {
            let step_entry = self.new_state();
            if lazy {
                self.add_transition(step_entry, TransitionKind::Epsilon, entry);
                self.add_transition(step_entry, TransitionKind::Epsilon, copy.entry);
            } else {
                self.add_transition(step_entry, TransitionKind::Epsilon, copy.entry);
                self.add_transition(step_entry, TransitionKind::Epsilon, entry);
            }
            self.add_transition(copy.exit, TransitionKind::Epsilon, entry);
            entry = step_entry;
        }

        Fragment { entry, exit }
    }

    /// Structurally clones a compiled fragment's state subgraph,
    /// preserving capturing-group tags and closing-state registrations
    /// but assigning each copied state a fresh `Handle`. Needed because
    /// `{n,m}` unrolls a subgraph into several independent repetitions
    /// that must not alias each other's states.
    fn clone_fragment(&mut self, fragment: Fragment) -> Fragment {
        let reachable = self.reachable_states(fragment.entry);
        let mut remap = std::collections::HashMap::with_capacity(reachable.len());
        for &old in &reachable {
            remap.insert(old, self.new_state());
        }

        for &old in &reachable {
            let old_node = self.states.get(old).clone();
            let new_handle = remap[&old];

            if let Some(group) = old_node.group_start {
                self.states.get_mut(new_handle).group_start = Some(group);
            }
            self.states.get_mut(new_handle).is_end = old_node.is_end;

            for transition in &old_node.transitions {
                let new_target = *remap.get(&transition.target).unwrap_or(&transition.target);
                self.add_transition(new_handle, transition.kind.clone(), new_target);
            }

            if let Some(&group) = self.closing_states.get(&old) {
                self.closing_states.insert(new_handle, group);
            }
        }

        Fragment {
            entry: remap[&fragment.entry],
            exit: remap[&fragment.exit],
        }
    }

    /// BFS over every state reachable from `start`, used to enumerate
    /// the states belonging to one fragment before it is wired into a
    /// larger graph (after which a naive reachability walk would pull
    /// in unrelated states too).
    fn reachable_states(&self, start: Handle) -> Vec<Handle> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![start];
        let mut order = Vec::new();

        while let Some(handle) = stack.pop() {
            if !seen.insert(handle) {
                continue;
            }
            order.push(handle);
            for transition in &self.states.get(handle).transitions {
                if !seen.contains(&transition.target) {
                    stack.push(transition.target);
                }
            }
        }

        order
    }
}

fn category_predicate_or_any(name: &str) -> fn(char) -> bool {
    // Unknown category names are rejected earlier, by the parser
    // (`parser::Parser::parse_unicode_category`), which calls
    // `unicode_category_predicate` itself before accepting the pattern;
    // by the time the compiler runs, `name` is guaranteed valid.
    unicode_category_predicate(name).unwrap_or(|_| false)
}

/// Compiles a parsed pattern into a `Program`, applying `case_insensitive`
/// and `dot_matches_line_separators` at the atom level.
/// `multiline` has no effect on compilation: it is purely a matcher-side
/// preprocessing concern (splitting the input into windows), since `^`
/// always just tests "start of the current window".
pub fn compile(
    ast: &Ast,
    group_count: usize,
    case_insensitive: bool,
    dot_matches_line_separators: bool,
) -> Result<Program, Error> {
    let mut builder = Builder::new(case_insensitive, dot_matches_line_separators);
    let body = builder.compile_expression(&ast.expression)?;

    let start = if ast.start_anchor {
        let anchored_entry = builder.new_state();
        builder.add_transition(anchored_entry, TransitionKind::StartAnchor, body.entry);
        anchored_entry
    } else {
        body.entry
    };

    builder.states.get_mut(body.exit).is_end = true;

    validate_backreferences(&ast.expression, group_count)?;

    trace!(
        "compiled pattern into {} state(s), {} capturing group(s)",
        builder.states.len(),
        builder.group_counter
    );

    Ok(Program {
        states: builder.states,
        start,
        closing_states: builder.closing_states,
        group_count,
    })
}

fn validate_backreferences(expr: &Expression, group_count: usize) -> Result<(), Error> {
    for item in &expr.items {
        match item {
            ExpressionItem::Backreference(group) => {
                if *group == 0 || *group > group_count {
                    return Err(Error::BackreferenceOutOfRange { group: *group });
                }
            }
            ExpressionItem::Group(group) => validate_backreferences(&group.inner, group_count)?,
            ExpressionItem::Alternation(left, right) => {
                validate_backreferences(left, group_count)?;
                validate_backreferences(right, group_count)?;
            }
            ExpressionItem::Match(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser;

    fn compile_pattern(pattern: &str) -> Program {
        let ast = parser::parse(pattern).unwrap();
        let group_count = parser::capturing_group_count(&ast);
        compile(&ast, group_count, false, false).unwrap()
    }

    /// Collects every state reachable from `start` via BFS, for
    /// assertions that need to inspect the whole compiled graph without
    /// depending on `Arena`'s internal layout.
    fn reachable(program: &Program, start: Handle) -> Vec<Handle> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![start];
        let mut order = Vec::new();

        while let Some(handle) = stack.pop() {
            if !seen.insert(handle) {
                continue;
            }
            order.push(handle);
            for transition in &program.state(handle).transitions {
                if !seen.contains(&transition.target) {
                    stack.push(transition.target);
                }
            }
        }

        order
    }

    #[test]
    fn literal_concatenation_reaches_an_end_state() {
        let program = compile_pattern("ab");
        let found_end = reachable(&program, program.start())
            .iter()
            .any(|&h| program.state(h).is_end);
        assert!(found_end);
    }

    #[test]
    fn group_marks_entry_as_capturing_start() {
        let program = compile_pattern("(a)");
        let found = reachable(&program, program.start())
            .iter()
            .any(|&h| program.state(h).group_start == Some(1));
        assert!(found);
    }

    #[test]
    fn nested_groups_are_numbered_by_open_paren_order() {
        let program = compile_pattern("(a(b))");
        let states = reachable(&program, program.start());
        let has_group_1 = states.iter().any(|&h| program.state(h).group_start == Some(1));
        let has_group_2 = states.iter().any(|&h| program.state(h).group_start == Some(2));
        assert!(has_group_1);
        assert!(has_group_2);
    }

    /// Regression test: the outer group must be numbered 1 and the
    /// nested group 2, not the reverse. A backreference to the *inner*
    /// group's number must bind to the inner group's own capture.
    #[test]
    fn outer_group_is_numbered_before_nested_group() {
        use crate::core::matcher;

        let ast = parser::parse(r"(a(b))\2").unwrap();
        let group_count = parser::capturing_group_count(&ast);
        let program = compile(&ast, group_count, false, false).unwrap();

        let results = matcher::search(&program, "abb", false, false, matcher::DEFAULT_ITERATION_BUDGET)
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].range, 0..3);
        // group 1 is the outer "(a(b))" => "ab"; group 2 is the inner
        // "(b)" => "b", which is what `\2` must have matched against.
        assert_eq!(results[0].captures[0], Some(0..2));
        assert_eq!(results[0].captures[1], Some(1..2));
    }

    #[test]
    fn backreference_out_of_range_is_rejected() {
        let expr = Expression::new(vec![ExpressionItem::Backreference(5)]);
        let ast = Ast {
            start_anchor: false,
            expression: expr,
        };
        let err = compile(&ast, 0, false, false).unwrap_err();
        assert_eq!(err, Error::BackreferenceOutOfRange { group: 5 });
    }

    #[test]
    fn case_insensitive_folds_literal() {
        let ast = parser::parse("A").unwrap();
        let program = compile(&ast, 0, true, false).unwrap();
        let start_transitions = &program.state(program.start()).transitions;
        match &start_transitions[0].kind {
            TransitionKind::Char(CharTest::Literal(c)) => assert_eq!(*c, 'a'),
            _ => panic!("expected a literal transition"),
        }
    }

    #[test]
    fn unknown_category_name_matches_nothing() {
        let predicate = category_predicate_or_any("NotACategory");
        assert!(!predicate('a'));
    }

    #[test]
    fn non_capturing_group_has_no_group_start_tag() {
        let program = compile_pattern("(?:a)");
        let found = reachable(&program, program.start())
            .iter()
            .any(|&h| program.state(h).group_start.is_some());
        assert!(!found);
    }
}
