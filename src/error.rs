//! The driver-facing error type.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::{Failure, Input};

/// A rejected parse, as returned by [`parse`](crate::Parser::parse) and
/// [`parse_partial`](crate::Parser::parse_partial).
///
/// Holds the deepest index any sub-attempt reached, the expected
/// descriptions collected there, and the zero-based line and column when the
/// input can derive them. The rendered message is deterministic: labels come
/// out sorted with a fixed separator.
#[derive(PartialEq, Eq, Debug, Clone, Error)]
#[error("{}", render(.expected, .furthest, .line_col))]
pub struct ParseError {
    pub furthest: usize,
    pub expected: BTreeSet<String>,
    pub line_col: Option<(usize, usize)>,
}

impl ParseError {
    pub(crate) fn from_failure<I: Input + ?Sized>(failure: Failure, input: &I) -> Self {
        let line_col = input.line_col(failure.furthest);
        ParseError {
            furthest: failure.furthest,
            expected: failure.expected,
            line_col,
        }
    }
}

fn render(
    expected: &BTreeSet<String>,
    furthest: &usize,
    line_col: &Option<(usize, usize)>,
) -> String {
    let at = match line_col {
        Some((line, col)) => format!("{line}:{col}"),
        None => format!("index {furthest}"),
    };
    if expected.is_empty() {
        return format!("unexpected input at {at}");
    }
    let labels = expected
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if expected.len() == 1 {
        format!("expected {labels} at {at}")
    } else {
        format!("expected one of {labels} at {at}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(
        furthest: usize,
        expected: &[&str],
        line_col: Option<(usize, usize)>,
    ) -> ParseError {
        ParseError {
            furthest,
            expected: expected.iter().map(|s| (*s).to_owned()).collect(),
            line_col,
        }
    }

    #[test]
    fn single_label_message() {
        let err = error(4, &["EOF"], Some((0, 4)));
        assert_eq!(err.to_string(), "expected EOF at 0:4");
    }

    #[test]
    fn several_labels_come_out_sorted() {
        let err = error(7, &["zeta", "alpha"], Some((1, 2)));
        assert_eq!(err.to_string(), "expected one of alpha, zeta at 1:2");
    }

    #[test]
    fn empty_set_is_an_unspecified_error() {
        let err = error(9, &[], None);
        assert_eq!(err.to_string(), "unexpected input at index 9");
    }

    #[test]
    fn token_inputs_report_raw_indexes() {
        let err = error(3, &["EOF"], None);
        assert_eq!(err.to_string(), "expected EOF at index 3");
    }
}
