//! Token parsing: slices of any element type as inputs.
//!
//! A lexer can produce a `Vec` of tokens and hand the slice to the same
//! combinators that consumed the source text. Slices have no line structure,
//! so errors report raw indexes.

use derive_where::derive_where;
use std::fmt::Debug;

use crate::{Input, Parser, Reply};

impl<T: Clone> Input for [T] {
    type Token = T;

    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn token_at(&self, index: usize) -> Option<(T, usize)> {
        self.get(index).map(|t| (t.clone(), index + 1))
    }
}

/// Match one specific token by equality. The expected description is the
/// token's [`Debug`] rendering, fixed at construction.
///
/// ```
/// use descend::{tokens::token, Parser};
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Tok {
///     Comma,
///     Ident(String),
/// }
///
/// let comma = token(Tok::Comma);
/// assert_eq!(comma.parse([Tok::Comma].as_slice()), Ok(Tok::Comma));
/// assert_eq!(
///     comma.parse([Tok::Ident("x".to_owned())].as_slice())
///         .unwrap_err()
///         .to_string(),
///     "expected Comma at index 0",
/// );
/// ```
pub fn token<T: Clone + PartialEq + Debug>(t: T) -> Token<T> {
    let label = format!("{t:?}");
    Token { t, label }
}

/// See [`token`].
#[derive_where(Clone; T: Clone)]
#[derive_where(Debug; T: Debug)]
pub struct Token<T> {
    t: T,
    label: String,
}

impl<T: Clone + PartialEq> Parser<[T]> for Token<T> {
    type Output = T;

    fn attempt(&self, input: &[T], index: usize) -> Reply<T> {
        match input.token_at(index) {
            Some((found, next)) if found == self.t => Reply::success(found, next),
            _ => Reply::failure(index, self.label.clone()),
        }
    }
}

/// Match a run of tokens exactly, like [`literal`](crate::text::literal)
/// over text.
pub fn tokens_eq<T, O>(ts: O) -> TokensEq<T>
where
    T: Clone + PartialEq + Debug,
    O: Into<Vec<T>>,
{
    let ts = ts.into();
    let label = format!("{ts:?}");
    TokensEq { ts, label }
}

/// See [`tokens_eq`].
#[derive_where(Clone; T: Clone)]
#[derive_where(Debug; T: Debug)]
pub struct TokensEq<T> {
    ts: Vec<T>,
    label: String,
}

impl<T: Clone + PartialEq> Parser<[T]> for TokensEq<T> {
    type Output = Vec<T>;

    fn attempt(&self, input: &[T], index: usize) -> Reply<Vec<T>> {
        match input.get(index..index + self.ts.len()) {
            Some(found) if found == self.ts.as_slice() => {
                Reply::success(self.ts.clone(), index + self.ts.len())
            }
            _ => Reply::failure(index, self.label.clone()),
        }
    }
}
