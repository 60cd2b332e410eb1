//! An easily composable parser combinator library with furthest-failure errors.
//!
//! Parsers are immutable values implementing [`Parser`]: an attempt at an
//! index either succeeds with a value and the next index, or fails with the
//! deepest index reached and the set of inputs that were expected there.
//! Failures from abandoned alternative branches are kept as bookkeeping so
//! that the final error names the deepest mismatch, not the shallowest.
//!
//! ```
//! use descend::{Parser, text::{literal, pattern}};
//!
//! let year = pattern("[0-9]{4}").map(|y| y.parse::<u32>().unwrap_or(0));
//! let date = year.skip(literal("-")).pair(pattern("[0-9]{2}"));
//! assert_eq!(date.parse("2017-01"), Ok((2017, "01".to_owned())));
//!
//! let err = date.parse("2017?01").unwrap_err();
//! assert_eq!(err.to_string(), "expected - at 0:4");
//! ```
//!
//! - [`core`] contains the combinators and the input-agnostic leaves
//! - [`text`] and [`tokens`] contain the leaves for [`str`] and slice inputs
//! - [`generate`] is the scripted sequencing layer
//! - [`error`] is the driver-facing error type
#![allow(internal_features)]
#![cfg_attr(feature = "nightly", feature(rustc_attrs))]
#![warn(clippy::style)]
#![warn(clippy::perf)]
#![warn(clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use std::{cmp::Ordering, collections::BTreeSet, sync::Arc};

pub mod core;
pub mod error;
pub mod generate;
pub mod macros;
pub mod text;
pub mod tokens;

use crate::core::{
    Bind, BoxedParser, Concat, Desc, Map, Optional, Or, Pair, SepBy, Skip, Then, Times,
};
use error::ParseError;

/// An indexable, length-bounded sequence that parsers consume.
///
/// Indexes are opaque to the combinators: only leaves look up elements, via
/// [`Input::token_at`], which returns the element together with the index
/// just past it (one for slices, the UTF-8 width for [`str`]).
pub trait Input {
    /// The element type handed to leaves ([`char`] for [`str`]).
    type Token: Clone;

    /// Total length of the input, in index units.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `index` and the index just past it, or [`None`] at the
    /// end of input (or off an element boundary).
    fn token_at(&self, index: usize) -> Option<(Self::Token, usize)>;

    /// Zero-based line and column for `index`, for inputs that have them.
    fn line_col(&self, index: usize) -> Option<(usize, usize)> {
        let _ = index;
        None
    }
}

/// A failed (or abandoned) attempt: the deepest index reached, and what was
/// expected there.
///
/// The expected set is ordered, so rendering is deterministic. An empty set
/// is legal and renders as an unspecified error.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Failure {
    pub furthest: usize,
    pub expected: BTreeSet<String>,
}

impl Failure {
    pub fn new(furthest: usize, label: impl Into<String>) -> Self {
        Self {
            furthest,
            expected: BTreeSet::from([label.into()]),
        }
    }

    pub fn empty(furthest: usize) -> Self {
        Self {
            furthest,
            expected: BTreeSet::new(),
        }
    }

    /// Combine two failures: the deeper one wins outright, equal depths
    /// union their expected sets.
    #[must_use]
    pub fn merge(self, other: Failure) -> Failure {
        match self.furthest.cmp(&other.furthest) {
            Ordering::Greater => self,
            Ordering::Less => other,
            Ordering::Equal => {
                let mut expected = self.expected;
                expected.extend(other.expected);
                Failure {
                    furthest: self.furthest,
                    expected,
                }
            }
        }
    }
}

pub(crate) fn merge_opt(a: Option<Failure>, b: Option<Failure>) -> Option<Failure> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.merge(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// The outcome of one [`Parser::attempt`].
///
/// A success records the next unconsumed index (always at least the start
/// index) and carries the deepest [`Failure`] seen in branches that were
/// attempted and abandoned on the way, so a later failure can be reported at
/// the deepest point reached overall.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Reply<T> {
    Ok {
        value: T,
        index: usize,
        failure: Option<Failure>,
    },
    Err(Failure),
}

impl<T> Reply<T> {
    pub fn success(value: T, index: usize) -> Self {
        Reply::Ok {
            value,
            index,
            failure: None,
        }
    }

    pub fn failure(furthest: usize, label: impl Into<String>) -> Self {
        Reply::Err(Failure::new(furthest, label))
    }

    /// Thread the bookkeeping of an earlier step into this reply, merging by
    /// the furthest-index rule.
    #[must_use]
    pub fn carry(self, prior: Option<Failure>) -> Self {
        match self {
            Reply::Ok {
                value,
                index,
                failure,
            } => Reply::Ok {
                value,
                index,
                failure: merge_opt(failure, prior),
            },
            Reply::Err(failure) => Reply::Err(match prior {
                Some(prior) => failure.merge(prior),
                None => failure,
            }),
        }
    }

    /// Discard the bookkeeping, keeping the plain outcome.
    pub fn to_result(self) -> Result<(T, usize), Failure> {
        match self {
            Reply::Ok { value, index, .. } => Ok((value, index)),
            Reply::Err(failure) => Err(failure),
        }
    }
}

/// Success values that support an associative combine, for [`Parser::concat`].
pub trait Combine {
    #[must_use]
    fn combine(self, other: Self) -> Self;
}

impl Combine for String {
    fn combine(mut self, other: Self) -> Self {
        self.push_str(&other);
        self
    }
}

impl<T> Combine for Vec<T> {
    fn combine(mut self, mut other: Self) -> Self {
        self.append(&mut other);
        self
    }
}

/// The capability interface implemented uniformly by every combinator.
///
/// A parser is an immutable value; [`Parser::attempt`] takes `&self`, so one
/// parser may be attempted concurrently from many threads. Combinator
/// methods consume `self` and wrap it; blanket implementations for `&P`,
/// `Box<P>` and `Arc<P>` let a parser be reused by reference instead.
///
/// ```
/// use descend::{Parser, text::digit};
///
/// let number = digit().at_least(1).map(|ds| ds.into_iter().collect::<String>());
/// assert_eq!(number.parse("2017"), Ok("2017".to_owned()));
/// ```
#[cfg_attr(
    feature = "nightly",
    rustc_on_unimplemented(
        message = "`{Self}` is not a `Parser` over `{I}` so cannot be combined & used as one",
        label = "Not a `Parser`",
    )
)]
pub trait Parser<I: Input + ?Sized> {
    type Output;

    /// Run this parser against `input` at `index`.
    ///
    /// Never mutates the input and never produces an index past
    /// `input.len()`. Failure is an ordinary value, not an error path.
    fn attempt(&self, input: &I, index: usize) -> Reply<Self::Output>;

    /// Run against the whole input: attempt at zero, then require the end of
    /// input, merging the end-of-input check with any carried bookkeeping so
    /// the deepest mismatch is the one reported.
    fn parse(&self, input: &I) -> Result<Self::Output, ParseError> {
        match self.attempt(input, 0) {
            Reply::Ok {
                value,
                index,
                failure,
            } => {
                if index == input.len() {
                    Ok(value)
                } else {
                    let eof = Failure::new(index, "EOF");
                    let merged = match failure {
                        Some(failure) => eof.merge(failure),
                        None => eof,
                    };
                    Err(ParseError::from_failure(merged, input))
                }
            }
            Reply::Err(failure) => Err(ParseError::from_failure(failure, input)),
        }
    }

    /// Run against a prefix of the input: no end-of-input check, returning
    /// the value and the next unconsumed index.
    fn parse_partial(&self, input: &I) -> Result<(Self::Output, usize), ParseError> {
        match self.attempt(input, 0) {
            Reply::Ok { value, index, .. } => Ok((value, index)),
            Reply::Err(failure) => Err(ParseError::from_failure(failure, input)),
        }
    }

    /// Apply `f` to the success value; failures pass through untouched.
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> U,
    {
        Map { p: self, f }
    }

    /// Choose the next parser from the success value and continue with it.
    /// On failure `f` is never called.
    fn bind<Q, F>(self, f: F) -> Bind<Self, F>
    where
        Self: Sized,
        Q: Parser<I>,
        F: Fn(Self::Output) -> Q,
    {
        Bind { p: self, f }
    }

    /// Run `self` then `q`, keeping `q`'s value.
    fn then<Q>(self, q: Q) -> Then<Self, Q>
    where
        Self: Sized,
        Q: Parser<I>,
    {
        Then { p: self, q }
    }

    /// Run `self` then `q`, keeping `self`'s value.
    fn skip<Q>(self, q: Q) -> Skip<Self, Q>
    where
        Self: Sized,
        Q: Parser<I>,
    {
        Skip { p: self, q }
    }

    /// Run `self` then `q`, keeping both values as a tuple. Nested pairs are
    /// the only builtin way to gather several results; see the
    /// [`pairs!`](crate::pairs) macro for sugar.
    fn pair<Q>(self, q: Q) -> Pair<Self, Q>
    where
        Self: Sized,
        Q: Parser<I>,
    {
        Pair { p: self, q }
    }

    /// Like [`Parser::pair`], but both values have the same [`Combine`] type
    /// and are combined into one.
    fn concat<Q>(self, q: Q) -> Concat<Self, Q>
    where
        Self: Sized,
        Self::Output: Combine,
        Q: Parser<I, Output = Self::Output>,
    {
        Concat { p: self, q }
    }

    /// Attempt `self`; on failure attempt `q` from the same index.
    /// Left-biased: when `self` succeeds `q` is never attempted. The two
    /// failures merge by the furthest-index rule.
    ///
    /// ```
    /// use descend::{Parser, text::literal};
    ///
    /// let greeting = literal("hello").or(literal("hey"));
    /// assert_eq!(greeting.parse("hey"), Ok("hey".to_owned()));
    /// assert_eq!(
    ///     greeting.parse("hi").unwrap_err().to_string(),
    ///     "expected one of hello, hey at 0:0",
    /// );
    /// ```
    fn or<Q>(self, q: Q) -> Or<Self, Q>
    where
        Self: Sized,
        Q: Parser<I, Output = Self::Output>,
    {
        Or { p: self, q }
    }

    /// Between `min` and `max` occurrences, collected into a [`Vec`].
    ///
    /// Iterative, so deep inputs cannot exhaust the stack. `min > max` is a
    /// programming error and panics here, before anything is parsed.
    fn times(self, min: usize, max: usize) -> Times<Self>
    where
        Self: Sized,
    {
        assert!(min <= max, "times: min ({min}) must not exceed max ({max})");
        Times {
            p: self,
            min,
            max: Some(max),
        }
    }

    /// `n` or more occurrences.
    fn at_least(self, n: usize) -> Times<Self>
    where
        Self: Sized,
    {
        Times {
            p: self,
            min: n,
            max: None,
        }
    }

    /// Up to `n` occurrences.
    fn at_most(self, n: usize) -> Times<Self>
    where
        Self: Sized,
    {
        Times {
            p: self,
            min: 0,
            max: Some(n),
        }
    }

    /// Any number of occurrences.
    fn many(self) -> Times<Self>
    where
        Self: Sized,
    {
        Times {
            p: self,
            min: 0,
            max: None,
        }
    }

    /// At most one occurrence, collapsed to an [`Option`]. Failure of the
    /// inner parser becomes a zero-width `None` success, with the failure
    /// kept as bookkeeping.
    fn optional(self) -> Optional<Self>
    where
        Self: Sized,
    {
        Optional(self)
    }

    /// Zero or more occurrences separated by `sep`, keeping the item values.
    fn sep_by<S>(self, sep: S) -> SepBy<Self, S>
    where
        Self: Sized,
        S: Parser<I>,
    {
        SepBy {
            p: self,
            sep,
            min_one: false,
        }
    }

    /// One or more occurrences separated by `sep`.
    fn sep_by1<S>(self, sep: S) -> SepBy<Self, S>
    where
        Self: Sized,
        S: Parser<I>,
    {
        SepBy {
            p: self,
            sep,
            min_one: true,
        }
    }

    /// Replace the expected set with `label` when the inner parser fails at
    /// the attempt's own start index. Failures from deeper inside pass
    /// through, keeping their more precise position.
    fn desc<L>(self, label: L) -> Desc<Self>
    where
        Self: Sized,
        L: Into<String>,
    {
        Desc {
            p: self,
            label: label.into(),
        }
    }

    /// Erase the concrete type behind an [`Arc`], for storage and recursion.
    fn boxed(self) -> BoxedParser<I, Self::Output>
    where
        Self: Sized + Send + Sync + 'static,
    {
        BoxedParser {
            inner: Arc::new(self),
        }
    }
}

impl<I: Input + ?Sized, P: Parser<I> + ?Sized> Parser<I> for &P {
    type Output = P::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<Self::Output> {
        (**self).attempt(input, index)
    }
}

impl<I: Input + ?Sized, P: Parser<I> + ?Sized> Parser<I> for Box<P> {
    type Output = P::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<Self::Output> {
        (**self).attempt(input, index)
    }
}

impl<I: Input + ?Sized, P: Parser<I> + ?Sized> Parser<I> for Arc<P> {
    type Output = P::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<Self::Output> {
        (**self).attempt(input, index)
    }
}
