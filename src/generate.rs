//! Scripted sequencing: host control flow between sub-parsers.
//!
//! [`generate`] builds a parser from a closure driving a [`Cursor`]. Each
//! [`Cursor::run`] attempts a sub-parser at the cursor's position and
//! advances on success; `?` abandons the script at the first failing step,
//! so later steps never run. The result is strictly equivalent to chained
//! [`Parser::bind`], with ordinary conditionals, loops and early returns in
//! between the steps.

use derive_where::derive_where;
use std::fmt::Debug;

use crate::{Failure, Input, Parser, Reply};

/// Build a parser from a script over a [`Cursor`].
///
/// ```
/// use descend::{generate::{generate, Cursor}, text::{literal, pattern}, Parser};
///
/// let year = pattern("[0-9]{4}");
/// let month = pattern("[0-9]{2}");
/// let dash = literal("-");
/// let date = generate(move |c: &mut Cursor<str>| {
///     let y = c.run(&year)?.parse::<u32>().unwrap_or(0);
///     c.run(&dash)?;
///     let m = c.run(&month)?.parse::<u32>().unwrap_or(0);
///     if m == 0 || m > 12 {
///         return Err(c.fail("a month between 01 and 12"));
///     }
///     Ok((y, m))
/// });
/// assert_eq!(date.parse("2017-02"), Ok((2017, 2)));
/// assert_eq!(
///     date.parse("2017-13").unwrap_err().to_string(),
///     "expected a month between 01 and 12 at 0:7",
/// );
/// ```
pub fn generate<F>(f: F) -> Generate<F> {
    Generate { f }
}

/// See [`generate`].
#[derive_where(Clone; F: Clone)]
#[derive_where(Debug; F: Debug)]
pub struct Generate<F> {
    f: F,
}

impl<I, F, T> Parser<I> for Generate<F>
where
    I: Input + ?Sized,
    F: Fn(&mut Cursor<'_, I>) -> Result<T, Halt>,
{
    type Output = T;

    fn attempt(&self, input: &I, index: usize) -> Reply<T> {
        let mut cursor = Cursor {
            input,
            index,
            carried: None,
            halted: None,
        };
        match (self.f)(&mut cursor) {
            Ok(value) => Reply::Ok {
                value,
                index: cursor.index,
                failure: cursor.carried,
            },
            Err(Halt { .. }) => Reply::Err(match cursor.halted {
                Some(failure) => failure,
                // NOTE: only a Halt smuggled in from another script's cursor
                //       can leave this unset
                None => Failure::empty(cursor.index),
            }),
        }
    }
}

/// The driver handle a [`generate`] script runs against: the input, the
/// current position, and the failure bookkeeping threaded between steps.
pub struct Cursor<'i, I: ?Sized> {
    input: &'i I,
    index: usize,
    carried: Option<Failure>,
    halted: Option<Failure>,
}

impl<I: Input + ?Sized> Cursor<'_, I> {
    /// Attempt `p` at the current position, advancing past what it consumed.
    ///
    /// On failure the script is abandoned: the failure is recorded and the
    /// returned [`Halt`] makes `?` return out of the closure.
    pub fn run<P: Parser<I>>(&mut self, p: &P) -> Result<P::Output, Halt> {
        match p.attempt(self.input, self.index).carry(self.carried.take()) {
            Reply::Ok {
                value,
                index,
                failure,
            } => {
                self.index = index;
                self.carried = failure;
                Ok(value)
            }
            Reply::Err(failure) => {
                self.halted = Some(failure);
                Err(Halt { _private: () })
            }
        }
    }

    /// Fail the script at the current position with `label` as the expected
    /// description, for rejections the sub-parsers cannot express.
    pub fn fail<L: Into<String>>(&mut self, label: L) -> Halt {
        let failure = Failure::new(self.index, label);
        self.halted = Some(match self.carried.take() {
            Some(carried) => failure.merge(carried),
            None => failure,
        });
        Halt { _private: () }
    }

    /// The current position, for scripts that mix parsing with computation.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Opaque token marking an abandoned script; the failure itself is recorded
/// on the [`Cursor`].
#[derive(Debug)]
pub struct Halt {
    _private: (),
}
