//! The input-agnostic combinators and leaves.
//!
//! Each combinator is a struct implementing [`Parser`], built by the methods
//! on the trait; the leaves here ([`success`], [`fail`], [`eof`], [`index`],
//! [`any`], [`satisfy`]) work over any [`Input`], carried as their first
//! type parameter. Input-specific leaves live in [`crate::text`] and
//! [`crate::tokens`].

use derive_where::derive_where;
use std::fmt::Debug;
use std::{
    marker::PhantomData,
    sync::{Arc, OnceLock, Weak},
};

use crate::{Combine, Failure, Input, Parser, Reply};

/// See [`Parser::map`].
#[derive_where(Clone; P: Clone, F: Clone)]
#[derive_where(Debug; P: Debug, F: Debug)]
pub struct Map<P, F> {
    pub(crate) p: P,
    pub(crate) f: F,
}

impl<I, P, F, U> Parser<I> for Map<P, F>
where
    I: Input + ?Sized,
    P: Parser<I>,
    F: Fn(P::Output) -> U,
{
    type Output = U;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<U> {
        match self.p.attempt(input, index) {
            Reply::Ok {
                value,
                index,
                failure,
            } => Reply::Ok {
                value: (self.f)(value),
                index,
                failure,
            },
            Reply::Err(failure) => Reply::Err(failure),
        }
    }
}

/// See [`Parser::bind`].
#[derive_where(Clone; P: Clone, F: Clone)]
#[derive_where(Debug; P: Debug, F: Debug)]
pub struct Bind<P, F> {
    pub(crate) p: P,
    pub(crate) f: F,
}

impl<I, P, Q, F> Parser<I> for Bind<P, F>
where
    I: Input + ?Sized,
    P: Parser<I>,
    Q: Parser<I>,
    F: Fn(P::Output) -> Q,
{
    type Output = Q::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<Q::Output> {
        match self.p.attempt(input, index) {
            Reply::Ok {
                value,
                index,
                failure,
            } => (self.f)(value).attempt(input, index).carry(failure),
            Reply::Err(failure) => Reply::Err(failure),
        }
    }
}

/// See [`Parser::then`].
#[derive_where(Clone; P: Clone, Q: Clone)]
#[derive_where(Debug; P: Debug, Q: Debug)]
pub struct Then<P, Q> {
    pub(crate) p: P,
    pub(crate) q: Q,
}

impl<I, P, Q> Parser<I> for Then<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I>,
    Q: Parser<I>,
{
    type Output = Q::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<Q::Output> {
        match self.p.attempt(input, index) {
            Reply::Ok { index, failure, .. } => self.q.attempt(input, index).carry(failure),
            Reply::Err(failure) => Reply::Err(failure),
        }
    }
}

/// See [`Parser::skip`].
#[derive_where(Clone; P: Clone, Q: Clone)]
#[derive_where(Debug; P: Debug, Q: Debug)]
pub struct Skip<P, Q> {
    pub(crate) p: P,
    pub(crate) q: Q,
}

impl<I, P, Q> Parser<I> for Skip<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I>,
    Q: Parser<I>,
{
    type Output = P::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<P::Output> {
        match self.p.attempt(input, index) {
            Reply::Ok {
                value,
                index,
                failure,
            } => match self.q.attempt(input, index).carry(failure) {
                Reply::Ok { index, failure, .. } => Reply::Ok {
                    value,
                    index,
                    failure,
                },
                Reply::Err(failure) => Reply::Err(failure),
            },
            Reply::Err(failure) => Reply::Err(failure),
        }
    }
}

/// See [`Parser::pair`].
#[derive_where(Clone; P: Clone, Q: Clone)]
#[derive_where(Debug; P: Debug, Q: Debug)]
pub struct Pair<P, Q> {
    pub(crate) p: P,
    pub(crate) q: Q,
}

impl<I, P, Q> Parser<I> for Pair<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I>,
    Q: Parser<I>,
{
    type Output = (P::Output, Q::Output);

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<(P::Output, Q::Output)> {
        match self.p.attempt(input, index) {
            Reply::Ok {
                value: first,
                index,
                failure,
            } => match self.q.attempt(input, index).carry(failure) {
                Reply::Ok {
                    value: second,
                    index,
                    failure,
                } => Reply::Ok {
                    value: (first, second),
                    index,
                    failure,
                },
                Reply::Err(failure) => Reply::Err(failure),
            },
            Reply::Err(failure) => Reply::Err(failure),
        }
    }
}

/// See [`Parser::concat`].
#[derive_where(Clone; P: Clone, Q: Clone)]
#[derive_where(Debug; P: Debug, Q: Debug)]
pub struct Concat<P, Q> {
    pub(crate) p: P,
    pub(crate) q: Q,
}

impl<I, P, Q> Parser<I> for Concat<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I>,
    P::Output: Combine,
    Q: Parser<I, Output = P::Output>,
{
    type Output = P::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<P::Output> {
        match self.p.attempt(input, index) {
            Reply::Ok {
                value: first,
                index,
                failure,
            } => match self.q.attempt(input, index).carry(failure) {
                Reply::Ok {
                    value: second,
                    index,
                    failure,
                } => Reply::Ok {
                    value: Combine::combine(first, second),
                    index,
                    failure,
                },
                Reply::Err(failure) => Reply::Err(failure),
            },
            Reply::Err(failure) => Reply::Err(failure),
        }
    }
}

/// See [`Parser::or`].
#[derive_where(Clone; P: Clone, Q: Clone)]
#[derive_where(Debug; P: Debug, Q: Debug)]
pub struct Or<P, Q> {
    pub(crate) p: P,
    pub(crate) q: Q,
}

impl<I, P, Q> Parser<I> for Or<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I>,
    Q: Parser<I, Output = P::Output>,
{
    type Output = P::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<P::Output> {
        match self.p.attempt(input, index) {
            ok @ Reply::Ok { .. } => ok,
            // INV: the second branch starts from the original index, a failed
            //      branch never consumes
            Reply::Err(first) => self.q.attempt(input, index).carry(Some(first)),
        }
    }
}

/// See [`Parser::times`], [`Parser::at_least`], [`Parser::at_most`] and
/// [`Parser::many`]. `max` of [`None`] is unbounded.
#[derive_where(Clone; P: Clone)]
#[derive_where(Debug; P: Debug)]
pub struct Times<P> {
    pub(crate) p: P,
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
}

impl<I, P> Parser<I> for Times<P>
where
    I: Input + ?Sized,
    P: Parser<I>,
{
    type Output = Vec<P::Output>;

    fn attempt(&self, input: &I, index: usize) -> Reply<Vec<P::Output>> {
        let mut values = Vec::new();
        let mut at = index;
        let mut carried: Option<Failure> = None;
        loop {
            if let Some(max) = self.max {
                if values.len() == max {
                    break;
                }
            }
            match self.p.attempt(input, at).carry(carried.take()) {
                Reply::Ok {
                    value,
                    index: next,
                    failure,
                } => {
                    carried = failure;
                    if self.max.is_none() && next == at {
                        // INV: a zero-width success would repeat forever, so
                        //      unbounded collection stops here
                        if values.len() < self.min {
                            return Reply::Err(match carried.take() {
                                Some(carried) => Failure::empty(at).merge(carried),
                                None => Failure::empty(at),
                            });
                        }
                        break;
                    }
                    values.push(value);
                    at = next;
                }
                Reply::Err(failure) => {
                    if values.len() >= self.min {
                        carried = Some(failure);
                        break;
                    }
                    return Reply::Err(failure);
                }
            }
        }
        Reply::Ok {
            value: values,
            index: at,
            failure: carried,
        }
    }
}

/// See [`Parser::optional`].
#[derive_where(Clone; P: Clone)]
#[derive_where(Debug; P: Debug)]
pub struct Optional<P>(pub(crate) P);

impl<I, P> Parser<I> for Optional<P>
where
    I: Input + ?Sized,
    P: Parser<I>,
{
    type Output = Option<P::Output>;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<Option<P::Output>> {
        match self.0.attempt(input, index) {
            Reply::Ok {
                value,
                index,
                failure,
            } => Reply::Ok {
                value: Some(value),
                index,
                failure,
            },
            Reply::Err(failure) => Reply::Ok {
                value: None,
                index,
                failure: Some(failure),
            },
        }
    }
}

/// See [`Parser::sep_by`] and [`Parser::sep_by1`].
/// ```text
/// P sep P sep P ... P
/// ```
#[derive_where(Clone; P: Clone, S: Clone)]
#[derive_where(Debug; P: Debug, S: Debug)]
pub struct SepBy<P, S> {
    pub(crate) p: P,
    pub(crate) sep: S,
    pub(crate) min_one: bool,
}

impl<I, P, S> Parser<I> for SepBy<P, S>
where
    I: Input + ?Sized,
    P: Parser<I>,
    S: Parser<I>,
{
    type Output = Vec<P::Output>;

    fn attempt(&self, input: &I, index: usize) -> Reply<Vec<P::Output>> {
        let mut values = Vec::new();
        let mut at = index;
        let mut carried = match self.p.attempt(input, at) {
            Reply::Ok {
                value,
                index: next,
                failure,
            } => {
                values.push(value);
                at = next;
                failure
            }
            Reply::Err(failure) => {
                return if self.min_one {
                    Reply::Err(failure)
                } else {
                    Reply::Ok {
                        value: values,
                        index,
                        failure: Some(failure),
                    }
                };
            }
        };
        loop {
            match self.sep.attempt(input, at).carry(carried.take()) {
                Reply::Ok { index, failure, .. } => {
                    match self.p.attempt(input, index).carry(failure) {
                        Reply::Ok {
                            value,
                            index: next,
                            failure,
                        } => {
                            carried = failure;
                            // INV: as in Times, zero-width pairs cannot repeat
                            if next == at {
                                break;
                            }
                            values.push(value);
                            at = next;
                        }
                        // Backtrack to before the separator
                        Reply::Err(failure) => {
                            carried = Some(failure);
                            break;
                        }
                    }
                }
                Reply::Err(failure) => {
                    carried = Some(failure);
                    break;
                }
            }
        }
        Reply::Ok {
            value: values,
            index: at,
            failure: carried,
        }
    }
}

/// See [`Parser::desc`].
#[derive_where(Clone; P: Clone)]
#[derive_where(Debug; P: Debug)]
pub struct Desc<P> {
    pub(crate) p: P,
    pub(crate) label: String,
}

impl<I, P> Parser<I> for Desc<P>
where
    I: Input + ?Sized,
    P: Parser<I>,
{
    type Output = P::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<P::Output> {
        match self.p.attempt(input, index) {
            Reply::Err(failure) if failure.furthest == index => {
                Reply::failure(index, self.label.clone())
            }
            other => other,
        }
    }
}

/// Run `p` and rewind: success keeps the value but consumes nothing, failure
/// passes through.
pub fn peek<P>(p: P) -> Peek<P> {
    Peek(p)
}

#[derive_where(Clone; P: Clone)]
#[derive_where(Debug; P: Debug)]
pub struct Peek<P>(P);

impl<I, P> Parser<I> for Peek<P>
where
    I: Input + ?Sized,
    P: Parser<I>,
{
    type Output = P::Output;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<P::Output> {
        match self.0.attempt(input, index) {
            Reply::Ok { value, .. } => Reply::success(value, index),
            Reply::Err(failure) => Reply::Err(failure),
        }
    }
}

/// Succeed zero-width when `p` fails; fail with `label` when `p` succeeds.
/// The inner failure is the wanted outcome and is not kept as bookkeeping.
pub fn not_followed_by<P, L: Into<String>>(p: P, label: L) -> NotFollowedBy<P> {
    NotFollowedBy {
        p,
        label: label.into(),
    }
}

#[derive_where(Clone; P: Clone)]
#[derive_where(Debug; P: Debug)]
pub struct NotFollowedBy<P> {
    p: P,
    label: String,
}

impl<I, P> Parser<I> for NotFollowedBy<P>
where
    I: Input + ?Sized,
    P: Parser<I>,
{
    type Output = ();

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<()> {
        match self.p.attempt(input, index) {
            Reply::Ok { .. } => Reply::failure(index, self.label.clone()),
            Reply::Err(_) => Reply::success((), index),
        }
    }
}

/// Succeed zero-width with a clone of `value`.
pub fn success<I: ?Sized, T: Clone>(value: T) -> Success<I, T> {
    Success {
        value,
        _marker: PhantomData,
    }
}

#[derive_where(Clone; T: Clone)]
#[derive_where(Debug; T: Debug)]
pub struct Success<I: ?Sized, T> {
    value: T,
    _marker: PhantomData<fn(&I)>,
}

impl<I, T> Parser<I> for Success<I, T>
where
    I: Input + ?Sized,
    T: Clone,
{
    type Output = T;

    #[inline]
    fn attempt(&self, _input: &I, index: usize) -> Reply<T> {
        Reply::success(self.value.clone(), index)
    }
}

/// Fail zero-width with `label` as the expected description.
pub fn fail<I: ?Sized, T, L: Into<String>>(label: L) -> Fail<I, T> {
    Fail {
        label: label.into(),
        _marker: PhantomData,
    }
}

#[derive_where(Clone, Debug)]
pub struct Fail<I: ?Sized, T> {
    label: String,
    _marker: PhantomData<fn(&I) -> T>,
}

impl<I, T> Parser<I> for Fail<I, T>
where
    I: Input + ?Sized,
{
    type Output = T;

    #[inline]
    fn attempt(&self, _input: &I, index: usize) -> Reply<T> {
        Reply::failure(index, self.label.clone())
    }
}

/// Succeed at the end of input, fail expecting `EOF` anywhere else.
pub fn eof<I: ?Sized>() -> Eof<I> {
    Eof {
        _marker: PhantomData,
    }
}

#[derive_where(Clone, Copy, Debug)]
pub struct Eof<I: ?Sized> {
    _marker: PhantomData<fn(&I)>,
}

impl<I> Parser<I> for Eof<I>
where
    I: Input + ?Sized,
{
    type Output = ();

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<()> {
        if index >= input.len() {
            Reply::success((), index)
        } else {
            Reply::failure(index, "EOF")
        }
    }
}

/// Succeed zero-width with the current index.
pub fn index<I: ?Sized>() -> Index<I> {
    Index {
        _marker: PhantomData,
    }
}

#[derive_where(Clone, Copy, Debug)]
pub struct Index<I: ?Sized> {
    _marker: PhantomData<fn(&I)>,
}

impl<I> Parser<I> for Index<I>
where
    I: Input + ?Sized,
{
    type Output = usize;

    #[inline]
    fn attempt(&self, _input: &I, index: usize) -> Reply<usize> {
        Reply::success(index, index)
    }
}

/// Consume one element of any kind.
pub fn any<I: ?Sized>() -> Any<I> {
    Any {
        _marker: PhantomData,
    }
}

#[derive_where(Clone, Copy, Debug)]
pub struct Any<I: ?Sized> {
    _marker: PhantomData<fn(&I)>,
}

impl<I> Parser<I> for Any<I>
where
    I: Input + ?Sized,
{
    type Output = I::Token;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<I::Token> {
        match input.token_at(index) {
            Some((token, next)) => Reply::success(token, next),
            None => Reply::failure(index, "any element"),
        }
    }
}

/// Consume one element for which `pred` holds, described by `label`.
pub fn satisfy<I: ?Sized, F, L: Into<String>>(pred: F, label: L) -> Satisfy<I, F> {
    Satisfy {
        pred,
        label: label.into(),
        _marker: PhantomData,
    }
}

#[derive_where(Clone; F: Clone)]
#[derive_where(Debug; F: Debug)]
pub struct Satisfy<I: ?Sized, F> {
    pred: F,
    label: String,
    _marker: PhantomData<fn(&I)>,
}

impl<I, F> Parser<I> for Satisfy<I, F>
where
    I: Input + ?Sized,
    F: Fn(&I::Token) -> bool,
{
    type Output = I::Token;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<I::Token> {
        match input.token_at(index) {
            Some((token, next)) if (self.pred)(&token) => Reply::success(token, next),
            _ => Reply::failure(index, self.label.clone()),
        }
    }
}

/// A parser erased behind an [`Arc`], from [`Parser::boxed`]. Cloning shares
/// the same parser, and the erased parser stays usable across threads.
#[derive_where(Clone)]
pub struct BoxedParser<I: Input + ?Sized, T> {
    pub(crate) inner: Arc<dyn Parser<I, Output = T> + Send + Sync>,
}

impl<I: Input + ?Sized, T> Parser<I> for BoxedParser<I, T> {
    type Output = T;

    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<T> {
        self.inner.attempt(input, index)
    }
}

/// A named indirection for recursive grammars: declare first, embed clones
/// in other parsers, then [`Forward::define`] the body once.
///
/// The declared value owns the definition; clones are weak handles, so a
/// grammar embedding its own handle never keeps itself alive. Keep (or
/// return) the declared value for as long as any handle may run.
///
/// Attempting before `define`, defining twice, or attempting a handle whose
/// declaration was dropped is a programming error and panics; none of these
/// are parse failures.
///
/// ```
/// use descend::{core::Forward, text::literal, Parser};
///
/// let nested: Forward<str, usize> = Forward::declare();
/// let depth = literal("(")
///     .then(nested.clone())
///     .skip(literal(")"))
///     .map(|n| n + 1)
///     .or(literal("x").map(|_| 0));
/// nested.define(depth);
/// assert_eq!(nested.parse("((x))"), Ok(2));
/// ```
pub struct Forward<I: Input + ?Sized, T> {
    slot: Slot<I, T>,
}

enum Slot<I: Input + ?Sized, T> {
    Declaration(Arc<OnceLock<BoxedParser<I, T>>>),
    Handle(Weak<OnceLock<BoxedParser<I, T>>>),
}

impl<I: Input + ?Sized, T> Forward<I, T> {
    #[must_use]
    pub fn declare() -> Self {
        Self {
            slot: Slot::Declaration(Arc::new(OnceLock::new())),
        }
    }

    /// Install the definition shared by every handle of this declaration.
    #[allow(clippy::panic)]
    pub fn define(&self, p: impl Parser<I, Output = T> + Send + Sync + 'static) {
        if self.cell().set(p.boxed()).is_err() {
            panic!("forward declaration defined twice");
        }
    }

    #[allow(clippy::panic)]
    fn cell(&self) -> Arc<OnceLock<BoxedParser<I, T>>> {
        match &self.slot {
            Slot::Declaration(cell) => Arc::clone(cell),
            // INV: upgradable while the declaration is alive, which outlives
            //      every run of the grammar embedding this handle
            Slot::Handle(weak) => match weak.upgrade() {
                Some(cell) => cell,
                None => panic!("forward declaration dropped while a handle was still in use"),
            },
        }
    }
}

impl<I: Input + ?Sized, T> Clone for Forward<I, T> {
    fn clone(&self) -> Self {
        // INV: clones hold the definition weakly, so a grammar embedding its
        //      own handle is freed once the declaration drops
        let weak = match &self.slot {
            Slot::Declaration(cell) => Arc::downgrade(cell),
            Slot::Handle(weak) => Weak::clone(weak),
        };
        Self {
            slot: Slot::Handle(weak),
        }
    }
}

impl<I: Input + ?Sized, T> Default for Forward<I, T> {
    fn default() -> Self {
        Self::declare()
    }
}

impl<I: Input + ?Sized, T> Parser<I> for Forward<I, T> {
    type Output = T;

    #[allow(clippy::panic)]
    #[inline]
    fn attempt(&self, input: &I, index: usize) -> Reply<T> {
        match self.cell().get() {
            Some(p) => p.attempt(input, index),
            None => panic!("forward declaration used before define"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::text::{digit, letter, literal};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run<P: Parser<str>>(p: &P, input: &str) -> Result<(P::Output, usize), Failure> {
        p.attempt(input, 0).to_result()
    }

    /// Counts attempts, for observing which branches run.
    struct Counted<P> {
        p: P,
        hits: Arc<AtomicUsize>,
    }

    impl<I: Input + ?Sized, P: Parser<I>> Parser<I> for Counted<P> {
        type Output = P::Output;

        fn attempt(&self, input: &I, index: usize) -> Reply<P::Output> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.p.attempt(input, index)
        }
    }

    #[test]
    fn map_identity_changes_nothing() {
        let plain = literal("ab");
        let mapped = literal("ab").map(|s| s);
        assert_eq!(run(&mapped, "abc"), run(&plain, "abc"));
        assert_eq!(run(&mapped, "xy"), run(&plain, "xy"));
    }

    #[test]
    fn map_failure_passes_through() {
        let p = digit().map(|c| c.to_ascii_uppercase());
        assert_eq!(run(&p, "x"), Err(Failure::new(0, "a digit")));
    }

    #[test]
    fn bind_is_not_called_on_failure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let p = digit().bind(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            literal("x")
        });
        assert!(run(&p, "no").is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bind_associates() {
        let left = digit()
            .bind(|_| letter())
            .bind(|c| literal(c.to_string()));
        let right = digit().bind(|_| letter().bind(|c| literal(c.to_string())));
        assert_eq!(run(&left, "1aa"), run(&right, "1aa"));
        assert_eq!(run(&left, "1ab"), run(&right, "1ab"));
    }

    #[test]
    fn then_and_skip_select_sides() {
        assert_eq!(run(&literal("a").then(digit()), "a1"), Ok(('1', 2)));
        assert_eq!(
            run(&literal("a").skip(digit()), "a1"),
            Ok(("a".to_owned(), 2))
        );
    }

    #[test]
    fn pair_gathers_both_values() {
        let p = digit().pair(letter());
        assert_eq!(run(&p, "1a"), Ok((('1', 'a'), 2)));
        assert_eq!(run(&p, "11"), Err(Failure::new(1, "a letter")));
    }

    #[test]
    fn concat_combines_equal_types() {
        let p = literal("ab").concat(literal("cd"));
        assert_eq!(run(&p, "abcd"), Ok(("abcd".to_owned(), 4)));
    }

    #[test]
    fn or_is_left_biased() {
        let hits = Arc::new(AtomicUsize::new(0));
        let second = Counted {
            p: literal("a"),
            hits: Arc::clone(&hits),
        };
        let p = literal("a").or(second);
        assert_eq!(run(&p, "a"), Ok(("a".to_owned(), 1)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn or_reports_the_deeper_failure() {
        let a = literal("aaa").then(fail("A"));
        let b = literal("aaaaa").then(fail("B"));
        let reply: Reply<String> = a.or(b).attempt("aaaaaaa", 0);
        assert_eq!(reply, Reply::Err(Failure::new(5, "B")));
    }

    #[test]
    fn or_unions_equal_depth_failures() {
        let a = literal("aaaa").then(fail("A"));
        let b = literal("aaaa").then(fail("B"));
        let reply: Reply<String> = a.or(b).attempt("aaaaaaa", 0);
        let Reply::Err(failure) = reply else {
            panic!("expected a failure")
        };
        assert_eq!(failure.furthest, 4);
        assert_eq!(
            failure.expected,
            BTreeSet::from(["A".to_owned(), "B".to_owned()])
        );
    }

    #[test]
    fn times_honours_both_bounds() {
        let p = digit().times(2, 4);
        assert_eq!(run(&p, "1x"), Err(Failure::new(1, "a digit")));
        assert_eq!(run(&p, "12x"), Ok((vec!['1', '2'], 2)));
        assert_eq!(run(&p, "123456"), Ok((vec!['1', '2', '3', '4'], 4)));
    }

    #[test]
    #[should_panic(expected = "must not exceed")]
    fn times_rejects_inverted_bounds_at_construction() {
        let _ = digit().times(3, 1);
    }

    #[test]
    fn unbounded_repetition_stops_on_zero_width_success() {
        let p = success('x').many();
        assert_eq!(p.attempt("abc", 0), Reply::success(Vec::new(), 0));

        let starved: Reply<Vec<char>> = success('x').at_least(2).attempt("abc", 0);
        assert_eq!(starved, Reply::Err(Failure::empty(0)));
    }

    #[test]
    fn repetition_keeps_the_stopping_failure() {
        let reply = digit().many().attempt("12a", 0);
        assert_eq!(
            reply,
            Reply::Ok {
                value: vec!['1', '2'],
                index: 2,
                failure: Some(Failure::new(2, "a digit")),
            }
        );
    }

    #[test]
    fn parse_merges_eof_with_carried_bookkeeping() {
        let err = digit().many().parse("12a").unwrap_err();
        assert_eq!(
            err,
            ParseError {
                furthest: 2,
                expected: BTreeSet::from(["EOF".to_owned(), "a digit".to_owned()]),
                line_col: Some((0, 2)),
            }
        );
    }

    #[test]
    fn optional_never_fails() {
        let p = digit().optional();
        assert_eq!(run(&p, "1"), Ok((Some('1'), 1)));
        assert_eq!(run(&p, "x"), Ok((None, 0)));
    }

    #[test]
    fn sep_by_collects_separated_items() {
        let p = digit().sep_by(literal(","));
        assert_eq!(run(&p, "1,2,3"), Ok((vec!['1', '2', '3'], 5)));
        assert_eq!(run(&p, ""), Ok((vec![], 0)));
        // A trailing separator is not consumed
        assert_eq!(run(&p, "1,2,"), Ok((vec!['1', '2'], 3)));
    }

    #[test]
    fn sep_by1_requires_a_first_item() {
        let p = digit().sep_by1(literal(","));
        assert_eq!(run(&p, "x"), Err(Failure::new(0, "a digit")));
        assert_eq!(run(&p, "7"), Ok((vec!['7'], 1)));
    }

    #[test]
    fn zero_width_items_end_separated_collection() {
        let p = success('x').sep_by(success(','));
        assert_eq!(p.attempt("abc", 0), Reply::success(vec!['x'], 0));
    }

    #[test]
    fn desc_replaces_only_failures_at_the_start() {
        let renamed = digit().desc("a number");
        assert_eq!(run(&renamed, "x"), Err(Failure::new(0, "a number")));

        let deeper = literal("ab").then(digit()).desc("a thing");
        assert_eq!(run(&deeper, "abx"), Err(Failure::new(2, "a digit")));
    }

    #[test]
    fn peek_consumes_nothing() {
        let p = peek(literal("ab"));
        assert_eq!(run(&p, "abc"), Ok(("ab".to_owned(), 0)));
        assert_eq!(run(&p, "x"), Err(Failure::new(0, "ab")));
    }

    #[test]
    fn not_followed_by_inverts() {
        let p = not_followed_by(digit(), "no digit here");
        assert_eq!(run(&p, "x"), Ok(((), 0)));
        assert_eq!(run(&p, "1"), Err(Failure::new(0, "no digit here")));
    }

    #[test]
    fn leaves_behave_zero_width() {
        assert_eq!(run(&success(5), "abc"), Ok((5, 0)));
        let boom: Result<(char, usize), Failure> = run(&fail("boom"), "abc");
        assert_eq!(boom, Err(Failure::new(0, "boom")));
        assert_eq!(run(&literal("ab").then(index()), "abc"), Ok((2, 2)));
    }

    #[test]
    fn eof_only_matches_the_end() {
        assert_eq!(run(&eof(), ""), Ok(((), 0)));
        assert_eq!(run(&eof(), "a"), Err(Failure::new(0, "EOF")));
    }

    #[test]
    fn any_and_satisfy_consume_one_element() {
        assert_eq!(run(&any(), "ab"), Ok(('a', 1)));
        assert_eq!(run(&any(), ""), Err(Failure::new(0, "any element")));

        let x = satisfy(|c: &char| *c == 'x', "an x");
        assert_eq!(run(&x, "xy"), Ok(('x', 1)));
        assert_eq!(run(&x, "y"), Err(Failure::new(0, "an x")));
    }

    #[test]
    fn agnostic_leaves_adopt_the_input_they_run_against() {
        let over_text = satisfy(|c: &char| *c == '!', "a bang").many();
        assert_eq!(run(&over_text, "!!x"), Ok((vec!['!', '!'], 2)));

        let over_tokens = satisfy(|b: &u8| *b % 2 == 0, "an even byte").many();
        assert_eq!(
            over_tokens.attempt(&[2u8, 4, 5][..], 0).to_result(),
            Ok((vec![2, 4], 2))
        );
    }

    #[test]
    fn boxed_erases_the_concrete_type() {
        let p = digit().map(|c| c as u8 - b'0').boxed();
        let again = p.clone();
        assert_eq!(p.parse("7"), Ok(7));
        assert_eq!(again.parse("8"), Ok(8));
    }

    #[test]
    fn forward_builds_recursive_grammars() {
        let nested: Forward<str, usize> = Forward::declare();
        let depth = literal("(")
            .then(nested.clone())
            .skip(literal(")"))
            .map(|n| n + 1)
            .or(literal("x").map(|_| 0));
        nested.define(depth);
        assert_eq!(nested.parse("x"), Ok(0));
        assert_eq!(nested.parse("((x))"), Ok(2));
        assert!(nested.parse("((x)").is_err());
    }

    #[test]
    #[should_panic(expected = "used before define")]
    fn forward_panics_when_used_undefined() {
        let undefined: Forward<str, char> = Forward::declare();
        let _ = undefined.parse("x");
    }

    #[test]
    #[should_panic(expected = "defined twice")]
    fn forward_panics_when_defined_twice() {
        let twice: Forward<str, char> = Forward::declare();
        twice.define(digit());
        twice.define(letter());
    }

    #[test]
    fn dropping_a_grammar_frees_captured_state() {
        let canary = Arc::new('x');
        let watch = Arc::downgrade(&canary);
        let expr: Forward<str, char> = Forward::declare();
        let leaf = satisfy(move |c: &char| *c == *canary, "an x");
        let nested = literal("(").then(expr.clone()).skip(literal(")"));
        expr.define(leaf.or(nested));
        assert_eq!(expr.parse("((x))"), Ok('x'));

        drop(expr);
        assert!(watch.upgrade().is_none());
    }

    #[test]
    #[should_panic(expected = "dropped")]
    fn a_handle_cannot_outlive_its_declaration() {
        let declared: Forward<str, char> = Forward::declare();
        let handle = declared.clone();
        declared.define(digit());
        drop(declared);
        let _ = handle.attempt("1", 0);
    }

    #[test]
    fn parse_partial_leaves_the_rest() {
        let p = literal("ab");
        assert_eq!(p.parse_partial("abcd"), Ok(("ab".to_owned(), 2)));
        assert!(p.parse("abcd").is_err());
    }
}
