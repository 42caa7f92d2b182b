//! Abstract syntax tree produced by `core::parser` and consumed by
//! `core::compiler`.

use std::fmt;

/// The root of a parsed pattern: an optional start-of-string anchor
/// (`Regex ::= "^"? Expression`) plus the expression it anchors.
#[derive(PartialEq, Clone, Debug)]
pub struct Ast {
    pub start_anchor: bool,
    pub expression: Expression,
}

/// Expression: an ordered, nonempty sequence of `ExpressionItem`s.
///
/// `start_anchor` is carried on the node but
/// is only ever set on the root expression returned by the parser's top
/// level (`Regex ::= "^"? Expression`); nested expressions (inside a
/// `Group` or an `Alternation` branch) always have it unset, since the
/// grammar does not admit `^` at those positions.
#[derive(PartialEq, Clone, Debug)]
pub struct Expression {
    pub items: Vec<ExpressionItem>,
    pub start_anchor: bool,
}

impl Expression {
    pub fn new(items: Vec<ExpressionItem>) -> Self {
        Expression {
            items,
            start_anchor: false,
        }
    }

    /// An expression matching only the empty string.
    pub fn empty() -> Self {
        Expression::new(Vec::new())
    }
}

/// ExpressionItem: one element of an `Expression`'s sequence.
///
/// Per the authoritative grammar (`ExpressionItem ::= Match | Group |
/// Backreference | Alternation`), an alternation is itself a single
/// item: the parser folds an entire `left | right` split into one
/// `Alternation` item holding the left concatenation and the remaining
/// expression as its two branches, right-associatively.
#[derive(PartialEq, Clone, Debug)]
pub enum ExpressionItem {
    Match(Match),
    Group(Group),
    Backreference(usize),
    Alternation(Box<Expression>, Box<Expression>),
}

/// Group: a parenthesized subexpression, optionally capturing, with an
/// optional trailing quantifier.
#[derive(PartialEq, Clone, Debug)]
pub struct Group {
    pub inner: Expression,
    pub capturing: bool,
    pub quantifier: Option<Quantifier>,
}

/// Match: a single atom with an optional trailing quantifier.
#[derive(PartialEq, Clone, Debug)]
pub struct Match {
    pub item: MatchItem,
    pub quantifier: Option<Quantifier>,
}

/// MatchItem: the atoms a bare `Match` can stand for.
#[derive(PartialEq, Clone, Debug)]
pub enum MatchItem {
    AnyCharacter,
    CharacterGroup {
        negated: bool,
        items: Vec<CharacterGroupItem>,
    },
    CharacterClass(ClassKind),
    UnicodeCategory(String),
    Character(char),
}

/// CharacterGroupItem: one element inside a `[...]` character group,
/// matching `CharacterGroupItem ::= CharacterClass | "\p{" Letters "}" |
/// Char ("-" Char)?` from the grammar.
#[derive(PartialEq, Clone, Debug)]
pub enum CharacterGroupItem {
    Class(ClassKind),
    UnicodeCategory(String),
    Single(char),
    Range(char, char),
}

/// ClassKind: the four character-class shorthands.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ClassKind {
    Word,
    NonWord,
    Digit,
    NonDigit,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ClassKind::Word => "\\w",
            ClassKind::NonWord => "\\W",
            ClassKind::Digit => "\\d",
            ClassKind::NonDigit => "\\D",
        };
        write!(f, "{}", s)
    }
}

/// Quantifier: `*`, `+`, `?`, or `{lo}` / `{lo,}` / `{lo,hi}`, each
/// optionally marked lazy with a trailing `?`.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Quantifier {
    pub kind: QuantifierKind,
    pub lazy: bool,
}

impl Quantifier {
    pub fn new(kind: QuantifierKind, lazy: bool) -> Self {
        Quantifier { kind, lazy }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum QuantifierKind {
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
    /// `{lo}` is represented as `Range(lo, Some(lo))`; `{lo,}` as
    /// `Range(lo, None)`; `{lo,hi}` as `Range(lo, Some(hi))`. The
    /// invariant `lo <= hi` (when `hi` is present) is enforced by the
    /// parser at construction time, not by this type.
    Range(usize, Option<usize>),
}
