use std::{error, fmt};

/// Interval: an inclusive range of Unicode scalar values, `[start, end]`.
///
/// Used to represent `a-b` character ranges inside a `CharacterGroup`
///.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Interval {
    start: char,
    end: char,
}

impl Interval {
    /// Builds a new interval `[start, end]`, or an error if `start > end`.
    pub fn new(start: char, end: char) -> Result<Self, Error> {
        if start > end {
            return Err(Error::Inverted { start, end });
        }

        Ok(Interval { start, end })
    }

    pub fn contains(&self, c: char) -> bool {
        self.start <= c && c <= self.end
    }
}

/// IntervalSet: an unordered union of `Interval`s, plus individually
/// listed characters, used to back `CharacterGroup` and `\p{...}`
/// membership tests. Lookups are a linear scan; character groups in
/// practice hold a handful of items so this stays cheap and avoids
/// pulling in an external interval-tree dependency for a data set this
/// small (see DESIGN.md).
#[derive(Clone, Debug, Default)]
pub struct IntervalSet {
    singles: Vec<char>,
    ranges: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        IntervalSet {
            singles: Vec::new(),
            ranges: Vec::new(),
        }
    }

    pub fn insert_char(&mut self, c: char) {
        self.singles.push(c);
    }

    pub fn insert_range(&mut self, interval: Interval) {
        self.ranges.push(interval);
    }

    pub fn contains(&self, c: char) -> bool {
        self.singles.contains(&c) || self.ranges.iter().any(|interval| interval.contains(c))
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.ranges.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Inverted { start: char, end: char },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Inverted { start, end } => write!(
                f,
                "invalid range: start '{}' is greater than end '{}'",
                start, end
            ),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_contains() {
        let interval = Interval::new('a', 'f').unwrap();

        assert!(interval.contains('a'));
        assert!(interval.contains('c'));
        assert!(interval.contains('f'));
        assert!(!interval.contains('g'));
        assert!(!interval.contains('0'));
    }

    #[test]
    fn interval_rejects_inverted_range() {
        let err = Interval::new('z', 'a').unwrap_err();
        assert_eq!(err, Error::Inverted { start: 'z', end: 'a' });
    }

    #[test]
    fn interval_allows_single_char_range() {
        let interval = Interval::new('m', 'm').unwrap();
        assert!(interval.contains('m'));
        assert!(!interval.contains('n'));
    }

    #[test]
    fn set_unions_chars_and_ranges() {
        let mut set = IntervalSet::new();
        set.insert_char('_');
        set.insert_range(Interval::new('a', 'z').unwrap());
        set.insert_range(Interval::new('0', '9').unwrap());

        assert!(set.contains('_'));
        assert!(set.contains('q'));
        assert!(set.contains('5'));
        assert!(!set.contains('!'));
        assert!(!set.is_empty());
    }

    #[test]
    fn empty_set_contains_nothing() {
        let set = IntervalSet::new();
        assert!(set.is_empty());
        assert!(!set.contains('a'));
    }
}
