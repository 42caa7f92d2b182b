//! Recursive-descent parser: pattern string -> `core::ast::Ast`. Each
//! grammar production maps to one function; every error carries the
//! pattern offset it was detected at, and the top level requires
//! end-of-input.

use std::{error, fmt};

use log::trace;

use crate::core::ast::{
    Ast, ClassKind, Expression, ExpressionItem, Group, Match, MatchItem, Quantifier,
    QuantifierKind,
};

/// Error: a parser failure, carrying a message and the pattern offset at
/// which it occurred — every diagnostic must carry an index.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Error {
    pub message: String,
    pub index: usize,
    pub pattern: String,
}

impl Error {
    fn new(message: impl Into<String>, index: usize, pattern: &str) -> Self {
        Error {
            message: message.into(),
            index,
            pattern: pattern.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at index {}", self.message, self.index)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

/// Parses `pattern` into an `Ast`, per `Regex ::= "^"? Expression`. The
/// entire input must be consumed; trailing garbage is an error.
pub fn parse(pattern: &str) -> Result<Ast, Error> {
    let mut parser = Parser::new(pattern);
    let ast = parser.parse_regex()?;

    if parser.pos != parser.chars.len() {
        return Err(parser.error("Unexpected character", parser.pos));
    }

    trace!(
        "parsed pattern \"{}\" into {} top-level item(s), {} capturing group(s)",
        pattern,
        ast.expression.items.len(),
        parser.group_count
    );

    Ok(ast)
}

/// Returns the number of capturing groups that will be assigned while
/// parsing `pattern`, without needing a fully successful parse. Exposed
/// so the compiler can validate backreferences against the AST's true
/// group count, which `parse` also records internally.
pub fn capturing_group_count(ast: &Ast) -> usize {
    fn count_expression(expr: &Expression, count: &mut usize) {
        for item in &expr.items {
            count_item(item, count);
        }
    }

    fn count_item(item: &ExpressionItem, count: &mut usize) {
        match item {
            ExpressionItem::Match(_) => {}
            ExpressionItem::Backreference(_) => {}
            ExpressionItem::Group(group) => {
                if group.capturing {
                    *count += 1;
                }
                count_expression(&group.inner, count);
            }
            ExpressionItem::Alternation(left, right) => {
                count_expression(left, count);
                count_expression(right, count);
            }
        }
    }

    let mut count = 0;
    count_expression(&ast.expression, &mut count);
    count
}

struct Parser<'p> {
    chars: Vec<char>,
    pattern: &'p str,
    pos: usize,
    group_count: usize,
}

const ESCAPABLE: &[char] = &[
    '(', ')', '[', ']', '{', '}', '|', '^', '$', '.', '*', '+', '?', '\\', '/',
];

impl<'p> Parser<'p> {
    fn new(pattern: &'p str) -> Self {
        Parser {
            chars: pattern.chars().collect(),
            pattern,
            pos: 0,
            group_count: 0,
        }
    }

    fn error(&self, message: impl Into<String>, index: usize) -> Error {
        Error::new(message, index, self.pattern)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, expected: char) -> Result<(), Error> {
        match self.advance() {
            Some(c) if c == expected => Ok(()),
            Some(_) => Err(self.error(format!("Expected '{}'", expected), self.pos - 1)),
            None => Err(self.error(format!("Expected '{}'", expected), self.pos)),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// `Regex ::= "^"? Expression`
    fn parse_regex(&mut self) -> Result<Ast, Error> {
        let start_anchor = if self.peek() == Some('^') {
            self.advance();
            true
        } else {
            false
        };

        let mut expression = self.parse_expression()?;
        expression.start_anchor = start_anchor;

        Ok(Ast {
            start_anchor,
            expression,
        })
    }

    /// `Expression ::= ExpressionItem+`, with alternation binding looser
    /// than concatenation: parse a concatenation, then if `|` follows,
    /// recurse to form a right-associative `Alternation`.
    fn parse_expression(&mut self) -> Result<Expression, Error> {
        let items = self.parse_concatenation()?;

        if self.peek() == Some('|') {
            self.advance();
            let left = Expression::new(items);
            let right = self.parse_expression()?;
            return Ok(Expression::new(vec![ExpressionItem::Alternation(
                Box::new(left),
                Box::new(right),
            )]));
        }

        if items.is_empty() {
            return Ok(Expression::empty());
        }

        Ok(Expression::new(items))
    }

    fn is_expression_terminator(&self) -> bool {
        matches!(self.peek(), None | Some('|') | Some(')'))
    }

    /// Parses a maximal run of `ExpressionItem`s that are not
    /// alternations themselves (those are folded in by `parse_expression`).
    fn parse_concatenation(&mut self) -> Result<Vec<ExpressionItem>, Error> {
        let mut items = Vec::new();

        while !self.is_expression_terminator() {
            items.push(self.parse_expression_item()?);
        }

        Ok(items)
    }

    fn parse_expression_item(&mut self) -> Result<ExpressionItem, Error> {
        match self.peek() {
            Some('(') => Ok(ExpressionItem::Group(self.parse_group()?)),
            Some('\\') if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) => {
                self.parse_backreference()
            }
            _ => Ok(ExpressionItem::Match(self.parse_match()?)),
        }
    }

    /// `Group ::= "(" "?:"? Expression ")" Quantifier?`
    fn parse_group(&mut self) -> Result<Group, Error> {
        let open_index = self.pos;
        self.eat('(')?;

        let capturing = if self.peek() == Some('?') && self.peek_at(1) == Some(':') {
            self.advance();
            self.advance();
            false
        } else {
            true
        };

        if capturing {
            self.group_count += 1;
        }

        let inner = self.parse_expression()?;

        if self.peek() != Some(')') {
            return Err(self.error("Unmatched opening parenthesis", open_index));
        }
        self.advance();

        let quantifier = self.try_parse_quantifier()?;

        Ok(Group {
            inner,
            capturing,
            quantifier,
        })
    }

    /// `Backreference ::= "\" Integer`
    fn parse_backreference(&mut self) -> Result<ExpressionItem, Error> {
        self.advance(); // '\'
        let digits_start = self.pos;
        let index = self.parse_integer(digits_start)?;

        if index == 0 {
            return Err(self.error("Backreference index must be at least 1", digits_start));
        }

        Ok(ExpressionItem::Backreference(index))
    }

    /// `Match ::= MatchItem Quantifier?`
    fn parse_match(&mut self) -> Result<Match, Error> {
        let item = self.parse_match_item()?;
        let quantifier = self.try_parse_quantifier()?;
        Ok(Match { item, quantifier })
    }

    fn parse_match_item(&mut self) -> Result<MatchItem, Error> {
        match self.peek() {
            None => Err(self.error("Unexpected end of pattern", self.pos)),
            Some('.') => {
                self.advance();
                Ok(MatchItem::AnyCharacter)
            }
            Some('[') => self.parse_character_group(),
            Some('\\') => self.parse_escape_outside_group(),
            Some(c @ (')' | '|' | '*' | '+' | '?' | '{' | '}' | ']' | '^' | '$')) => {
                Err(self.error(
                    format!("Unexpected character '{}', escape it to match literally", c),
                    self.pos,
                ))
            }
            Some(c) => {
                self.advance();
                self.validate_pattern_char(c, self.pos - 1)?;
                Ok(MatchItem::Character(c))
            }
        }
    }

    fn parse_escape_outside_group(&mut self) -> Result<MatchItem, Error> {
        let backslash_index = self.pos;
        self.advance(); // '\'

        match self.peek() {
            Some('p') => Ok(MatchItem::UnicodeCategory(self.parse_unicode_category()?)),
            Some(c) if class_kind(c).is_some() => {
                self.advance();
                Ok(MatchItem::CharacterClass(class_kind(c).unwrap()))
            }
            Some(c) if ESCAPABLE.contains(&c) => {
                self.advance();
                Ok(MatchItem::Character(c))
            }
            Some(c) => Err(self.error(format!("Unknown escape '\\{}'", c), backslash_index)),
            None => Err(self.error("Unterminated escape sequence", backslash_index)),
        }
    }

    /// `"\p{" Letters "}"`
    fn parse_unicode_category(&mut self) -> Result<String, Error> {
        let p_index = self.pos;
        self.advance(); // 'p'

        if self.peek() != Some('{') {
            return Err(self.error("Expected '{' after \\p", self.pos));
        }
        self.advance();

        let letters_start = self.pos;
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if name.is_empty() {
            return Err(self.error("Expected one or more letters in \\p{...}", letters_start));
        }

        if self.peek() != Some('}') {
            return Err(self.error("Unterminated \\p{...}", p_index));
        }
        self.advance();

        if crate::core::compiler::unicode_category_predicate(&name).is_none() {
            return Err(self.error(
                format!("Unknown Unicode category \\p{{{}}}", name),
                letters_start,
            ));
        }

        Ok(name)
    }

    /// `CharacterGroup ::= "[" "^"? CharacterGroupItem+ "]"`
    fn parse_character_group(&mut self) -> Result<MatchItem, Error> {
        let open_index = self.pos;
        self.advance(); // '['

        let negated = if self.peek() == Some('^') {
            self.advance();
            true
        } else {
            false
        };

        let mut items = Vec::new();
        while self.peek() != Some(']') {
            if self.at_end() {
                return Err(self.error("Unmatched opening bracket", open_index));
            }
            items.push(self.parse_character_group_item()?);
        }
        self.advance(); // ']'

        if items.is_empty() {
            return Err(self.error("Empty character group", open_index));
        }

        Ok(MatchItem::CharacterGroup { negated, items })
    }

    fn parse_character_group_item(
        &mut self,
    ) -> Result<crate::core::ast::CharacterGroupItem, Error> {
        use crate::core::ast::CharacterGroupItem;

        if self.peek() == Some('\\') {
            let backslash_index = self.pos;
            self.advance();

            return match self.peek() {
                Some('p') => Ok(CharacterGroupItem::UnicodeCategory(
                    self.parse_unicode_category()?,
                )),
                Some(c) if class_kind(c).is_some() => {
                    self.advance();
                    Ok(CharacterGroupItem::Class(class_kind(c).unwrap()))
                }
                Some(c) if ESCAPABLE.contains(&c) || c == ']' || c == '-' => {
                    self.advance();
                    self.parse_possible_range(c, backslash_index)
                }
                Some(c) => Err(self.error(format!("Unknown escape '\\{}'", c), backslash_index)),
                None => Err(self.error("Unterminated escape sequence", backslash_index)),
            };
        }

        let char_index = self.pos;
        let c = self.advance().unwrap();
        self.validate_pattern_char(c, char_index)?;
        self.parse_possible_range(c, char_index)
    }

    /// Having just consumed character `c` (a literal, possibly escaped,
    /// character at `char_index`), checks whether it opens a `a-b` range.
    fn parse_possible_range(
        &mut self,
        c: char,
        char_index: usize,
    ) -> Result<crate::core::ast::CharacterGroupItem, Error> {
        use crate::core::ast::CharacterGroupItem;

        if self.peek() == Some('-') && self.peek_at(1) != Some(']') && self.peek_at(1).is_some() {
            self.advance(); // '-'
            let end_index = self.pos;
            let end = if self.peek() == Some('\\') {
                self.advance();
                match self.advance() {
                    Some(escaped) if ESCAPABLE.contains(&escaped) => escaped,
                    Some(escaped) => {
                        return Err(
                            self.error(format!("Unknown escape '\\{}'", escaped), end_index)
                        )
                    }
                    None => return Err(self.error("Unterminated escape sequence", end_index)),
                }
            } else {
                self.advance().unwrap()
            };
            self.validate_pattern_char(end, end_index)?;

            if c > end {
                return Err(self.error(
                    format!("Invalid range: '{}' is greater than '{}'", c, end),
                    char_index,
                ));
            }

            return Ok(CharacterGroupItem::Range(c, end));
        }

        Ok(CharacterGroupItem::Single(c))
    }

    /// `Quantifier ::= ("*" | "+" | "?" | RangeQuantifier) "?"?`
    fn try_parse_quantifier(&mut self) -> Result<Option<Quantifier>, Error> {
        let kind = match self.peek() {
            Some('*') => {
                self.advance();
                QuantifierKind::ZeroOrMore
            }
            Some('+') => {
                self.advance();
                QuantifierKind::OneOrMore
            }
            Some('?') => {
                self.advance();
                QuantifierKind::ZeroOrOne
            }
            Some('{') => self.parse_range_quantifier()?,
            _ => return Ok(None),
        };

        let lazy = if self.peek() == Some('?') {
            self.advance();
            true
        } else {
            false
        };

        Ok(Some(Quantifier::new(kind, lazy)))
    }

    /// `RangeQuantifier ::= "{" Integer ("," Integer?)? "}"`
    fn parse_range_quantifier(&mut self) -> Result<QuantifierKind, Error> {
        let open_index = self.pos;
        self.advance(); // '{'

        let lo_index = self.pos;
        let lo = self.parse_integer(lo_index)?;

        let kind = if self.peek() == Some(',') {
            self.advance();
            if self.peek() == Some('}') {
                QuantifierKind::Range(lo, None)
            } else {
                let hi_index = self.pos;
                let hi = self.parse_integer(hi_index)?;
                if hi < lo {
                    return Err(self.error(
                        format!(
                            "Invalid quantifier bounds: {{{},{}}} has hi < lo",
                            lo, hi
                        ),
                        open_index,
                    ));
                }
                QuantifierKind::Range(lo, Some(hi))
            }
        } else {
            QuantifierKind::Range(lo, Some(lo))
        };

        if self.peek() != Some('}') {
            return Err(self.error("Unterminated quantifier", open_index));
        }
        self.advance();

        Ok(kind)
    }

    fn parse_integer(&mut self, start: usize) -> Result<usize, Error> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(self.error("Expected one or more digits", start));
        }

        digits
            .parse::<usize>()
            .map_err(|_| self.error("Integer literal out of range", start))
    }

    /// Checks `c` against the `Char` production's scalar ranges: tab,
    /// LF, CR, or any scalar in `0x20..=0xD7FF`, `0xE000..=0xFFFD`, or
    /// `0x10000..=0x10FFFF`.
    fn validate_pattern_char(&self, c: char, index: usize) -> Result<(), Error> {
        let scalar = c as u32;
        let valid = matches!(c, '\t' | '\n' | '\r')
            || (0x20..=0xD7FF).contains(&scalar)
            || (0xE000..=0xFFFD).contains(&scalar)
            || (0x10000..=0x10FFFF).contains(&scalar);

        if valid {
            Ok(())
        } else {
            Err(self.error(format!("Invalid pattern character U+{:04X}", scalar), index))
        }
    }
}

fn class_kind(c: char) -> Option<ClassKind> {
    match c {
        'w' => Some(ClassKind::Word),
        'W' => Some(ClassKind::NonWord),
        'd' => Some(ClassKind::Digit),
        'D' => Some(ClassKind::NonDigit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ast::{CharacterGroupItem, QuantifierKind};

    #[test]
    fn empty_pattern_parses_to_empty_expression() {
        let ast = parse("").unwrap();
        assert!(ast.expression.items.is_empty());
        assert!(!ast.start_anchor);
    }

    #[test]
    fn parses_literal_concatenation() {
        let ast = parse("ab").unwrap();
        assert_eq!(ast.expression.items.len(), 2);
    }

    #[test]
    fn parses_start_anchor() {
        let ast = parse("^foo").unwrap();
        assert!(ast.start_anchor);
        assert!(ast.expression.start_anchor);
    }

    #[test]
    fn parses_alternation_as_single_item() {
        let ast = parse("a|b").unwrap();
        assert_eq!(ast.expression.items.len(), 1);
        assert!(matches!(
            ast.expression.items[0],
            ExpressionItem::Alternation(_, _)
        ));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = parse("a)").unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn rejects_unmatched_opening_paren() {
        let err = parse("(a").unwrap_err();
        assert!(err.message.contains("Unmatched opening parenthesis"));
    }

    #[test]
    fn rejects_unmatched_closing_paren() {
        let err = parse("a)").unwrap_err();
        assert!(err.message.contains("Unexpected character"));
    }

    #[test]
    fn rejects_empty_character_group() {
        let err = parse("[]").unwrap_err();
        assert!(err.message.contains("Empty character group"));
    }

    #[test]
    fn parses_negated_character_group_with_range() {
        let ast = parse("[^a-z0-9_]").unwrap();
        match &ast.expression.items[0] {
            ExpressionItem::Match(Match {
                item: MatchItem::CharacterGroup { negated, items },
                ..
            }) => {
                assert!(*negated);
                assert_eq!(items.len(), 3);
                assert!(matches!(items[0], CharacterGroupItem::Range('a', 'z')));
            }
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn rejects_inverted_range() {
        let err = parse("[z-a]").unwrap_err();
        assert!(err.message.contains("Invalid range"));
    }

    #[test]
    fn parses_backreference() {
        let ast = parse("(ab)\\1").unwrap();
        assert!(matches!(
            ast.expression.items[1],
            ExpressionItem::Backreference(1)
        ));
    }

    #[test]
    fn parses_range_quantifier() {
        let ast = parse("a{2,3}?").unwrap();
        match &ast.expression.items[0] {
            ExpressionItem::Match(Match {
                quantifier: Some(q),
                ..
            }) => {
                assert_eq!(q.kind, QuantifierKind::Range(2, Some(3)));
                assert!(q.lazy);
            }
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn rejects_inverted_quantifier_bounds() {
        let err = parse("a{3,2}").unwrap_err();
        assert!(err.message.contains("hi < lo"));
    }

    #[test]
    fn parses_non_capturing_group() {
        let ast = parse("(?:ab)+").unwrap();
        match &ast.expression.items[0] {
            ExpressionItem::Group(group) => assert!(!group.capturing),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn parses_unicode_category() {
        let ast = parse("\\p{Lu}").unwrap();
        assert!(matches!(
            &ast.expression.items[0],
            ExpressionItem::Match(Match {
                item: MatchItem::UnicodeCategory(name),
                ..
            }) if name == "Lu"
        ));
    }

    #[test]
    fn counts_capturing_groups_ignoring_non_capturing() {
        let ast = parse("(a)(?:b)(c|(d))").unwrap();
        assert_eq!(capturing_group_count(&ast), 3);
    }
}
