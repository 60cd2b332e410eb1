//! Text parsing: [`str`] as an input, plus character and string leaves.
//!
//! Indexes into a [`str`] are byte offsets, so positions coming out of
//! [`Parser::parse_partial`](crate::Parser::parse_partial) slice the input
//! directly. Leaves only ever advance by whole characters, keeping every
//! reported index on a UTF-8 boundary.

use regex::Regex;

use crate::core::{satisfy, Satisfy};
use crate::{Failure, Input, Parser, Reply};

impl Input for str {
    type Token = char;

    fn len(&self) -> usize {
        str::len(self)
    }

    fn token_at(&self, index: usize) -> Option<(char, usize)> {
        let c = self.get(index..)?.chars().next()?;
        Some((c, index + c.len_utf8()))
    }

    fn line_col(&self, index: usize) -> Option<(usize, usize)> {
        let upto = self.get(..index)?;
        let line = upto.matches('\n').count();
        let col = index - upto.rfind('\n').map_or(0, |newline| newline + 1);
        Some((line, col))
    }
}

/// Match `text` exactly, producing an owned copy of it.
///
/// ```
/// use descend::{text::literal, Parser};
///
/// assert_eq!(literal("let").parse("let"), Ok("let".to_owned()));
/// assert_eq!(
///     literal("let").parse("lot").unwrap_err().to_string(),
///     "expected let at 0:0",
/// );
/// ```
pub fn literal<L: Into<String>>(text: L) -> Literal {
    Literal { text: text.into() }
}

/// See [`literal`].
#[derive(Clone, Debug)]
pub struct Literal {
    text: String,
}

impl Parser<str> for Literal {
    type Output = String;

    fn attempt(&self, input: &str, index: usize) -> Reply<String> {
        match input.get(index..index + self.text.len()) {
            Some(found) if found == self.text => {
                Reply::success(self.text.clone(), index + self.text.len())
            }
            _ => Reply::failure(index, self.text.clone()),
        }
    }
}

/// Match a regular expression at the current position, producing the matched
/// text. The expression is implicitly anchored: it never skips ahead to find
/// a match later in the input.
///
/// # Panics
/// If `pat` is not a valid regular expression.
///
/// ```
/// use descend::{text::pattern, Parser};
///
/// let number = pattern("[0-9]+");
/// assert_eq!(number.parse_partial("123abc"), Ok(("123".to_owned(), 3)));
/// assert!(number.parse("abc123").is_err());
/// ```
#[allow(clippy::panic)]
pub fn pattern(pat: &str) -> Pattern {
    let re = match Regex::new(&format!("^(?:{pat})")) {
        Ok(re) => re,
        Err(err) => panic!("pattern: invalid regular expression {pat:?}: {err}"),
    };
    Pattern {
        re,
        label: pat.to_owned(),
    }
}

/// See [`pattern`].
#[derive(Clone, Debug)]
pub struct Pattern {
    re: Regex,
    label: String,
}

impl Parser<str> for Pattern {
    type Output = String;

    fn attempt(&self, input: &str, index: usize) -> Reply<String> {
        match input.get(index..).and_then(|tail| self.re.find(tail)) {
            Some(found) => Reply::success(found.as_str().to_owned(), index + found.end()),
            None => Reply::failure(index, self.label.clone()),
        }
    }
}

/// Match one specific character.
pub fn match_char(c: char) -> MatchChar {
    MatchChar { c }
}

/// See [`match_char`].
#[derive(Clone, Debug)]
pub struct MatchChar {
    c: char,
}

impl Parser<str> for MatchChar {
    type Output = char;

    fn attempt(&self, input: &str, index: usize) -> Reply<char> {
        match input.token_at(index) {
            Some((found, next)) if found == self.c => Reply::success(found, next),
            _ => Reply::failure(index, self.c.to_string()),
        }
    }
}

/// Match any one character out of `set`.
pub fn one_of<L: Into<String>>(set: L) -> OneOf {
    OneOf { set: set.into() }
}

/// See [`one_of`].
#[derive(Clone, Debug)]
pub struct OneOf {
    set: String,
}

impl Parser<str> for OneOf {
    type Output = char;

    fn attempt(&self, input: &str, index: usize) -> Reply<char> {
        match input.token_at(index) {
            Some((found, next)) if self.set.contains(found) => Reply::success(found, next),
            _ => Reply::failure(index, format!("[{}]", self.set)),
        }
    }
}

/// Match one alphabetic character.
pub fn letter() -> Satisfy<str, fn(&char) -> bool> {
    satisfy(|c: &char| c.is_alphabetic(), "a letter")
}

/// Match one ASCII digit.
pub fn digit() -> Satisfy<str, fn(&char) -> bool> {
    satisfy(|c: &char| c.is_ascii_digit(), "a digit")
}

/// Match a run of whitespace.
pub fn whitespace() -> Pattern {
    pattern(r"\s+")
}

/// Match whichever of `options` appears here, trying longer options before
/// their prefixes so `">="` wins over `">"` regardless of listing order.
///
/// ```
/// use descend::{text::literal_from, Parser};
///
/// let op = literal_from([">", ">=", "<", "<="]);
/// assert_eq!(op.parse(">="), Ok(">=".to_owned()));
/// ```
pub fn literal_from<'a, O: IntoIterator<Item = &'a str>>(options: O) -> LiteralFrom {
    let mut options: Vec<String> = options.into_iter().map(str::to_owned).collect();
    options.sort_by_key(|option| std::cmp::Reverse(option.len()));
    LiteralFrom { options }
}

/// See [`literal_from`].
#[derive(Clone, Debug)]
pub struct LiteralFrom {
    options: Vec<String>,
}

impl Parser<str> for LiteralFrom {
    type Output = String;

    fn attempt(&self, input: &str, index: usize) -> Reply<String> {
        for option in &self.options {
            if let Some(found) = input.get(index..index + option.len()) {
                if found == option.as_str() {
                    return Reply::success(option.clone(), index + option.len());
                }
            }
        }
        Reply::Err(Failure {
            furthest: index,
            expected: self.options.iter().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_matches_exactly() {
        assert_eq!(literal("hello").parse("hello"), Ok("hello".to_owned()));
        assert_eq!(
            literal("llo").attempt("hello", 2),
            Reply::success("llo".to_owned(), 5)
        );
        assert_eq!(
            literal("hello").attempt("help", 0),
            Reply::failure(0, "hello")
        );
    }

    #[test]
    fn leftover_input_is_an_eof_failure() {
        assert_eq!(
            literal("x").parse("xy").unwrap_err().to_string(),
            "expected EOF at 0:1"
        );
    }

    #[test]
    fn pattern_is_anchored() {
        assert_eq!(
            pattern("[0-9]+").attempt("ab12", 0),
            Reply::failure(0, "[0-9]+")
        );
        assert_eq!(
            pattern("[0-9]+").attempt("ab12", 2),
            Reply::success("12".to_owned(), 4)
        );
    }

    #[test]
    fn pattern_advances_past_the_match() {
        assert_eq!(
            pattern("[a-z]+").parse_partial("abc123"),
            Ok(("abc".to_owned(), 3))
        );
    }

    #[test]
    #[should_panic(expected = "invalid regular expression")]
    fn pattern_rejects_malformed_expressions() {
        pattern("(unclosed");
    }

    #[test]
    fn characters_advance_by_utf8_width() {
        assert_eq!("héllo".token_at(1), Some(('é', 3)));
        assert_eq!(
            letter().many().parse("héllo"),
            Ok(vec!['h', 'é', 'l', 'l', 'o'])
        );
    }

    #[test]
    fn token_lookup_stops_at_the_end() {
        assert_eq!("abc".token_at(3), None);
        assert_eq!("abc".token_at(7), None);
    }

    #[test]
    fn line_and_column_are_zero_based() {
        assert_eq!("ab\ncd".line_col(0), Some((0, 0)));
        assert_eq!("ab\ncd".line_col(2), Some((0, 2)));
        assert_eq!("ab\ncd".line_col(3), Some((1, 0)));
        assert_eq!("ab\ncd".line_col(4), Some((1, 1)));
        assert_eq!("é".line_col(1), None);
    }

    #[test]
    fn char_leaves_describe_themselves() {
        assert_eq!(
            match_char('x').parse("y").unwrap_err().to_string(),
            "expected x at 0:0"
        );
        assert_eq!(
            one_of("+-").parse("*").unwrap_err().to_string(),
            "expected [+-] at 0:0"
        );
        assert_eq!(
            digit().parse("x").unwrap_err().to_string(),
            "expected a digit at 0:0"
        );
    }

    #[test]
    fn char_leaves_accept_their_sets() {
        assert_eq!(match_char('x').parse("x"), Ok('x'));
        assert_eq!(one_of("+-").parse("-"), Ok('-'));
        assert_eq!(letter().parse("q"), Ok('q'));
        assert_eq!(whitespace().parse_partial(" \t\nx"), Ok((" \t\n".to_owned(), 3)));
    }

    #[test]
    fn literal_from_prefers_the_longest_option() {
        assert_eq!(
            literal_from(["in", "int"]).parse_partial("int x"),
            Ok(("int".to_owned(), 3))
        );
    }

    #[test]
    fn literal_from_reports_every_option() {
        assert_eq!(
            literal_from(["let", "in"]).parse("fn").unwrap_err().to_string(),
            "expected one of in, let at 0:0"
        );
    }
}
