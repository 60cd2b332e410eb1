//! Helper macros

/// Helper to combine deeply nested pairs.
/// ```ignore
/// P1.pair(P2.pair(P3.pair(P4)))
/// // is equivalent to
/// pairs!(P1, P2, P3, P4)
/// ```
#[macro_export]
macro_rules! pairs {
    ($p:expr) => {
        $p
    };
    ($p:expr , $($ts:tt)+) => {
        $crate::Parser::pair($p, $crate::pairs!($($ts)+))
    };
}

pub use pairs;

/// Helper to combine deeply nested choices.
/// ```ignore
/// P1.or(P2.or(P3.or(P4)))
/// // is equivalent to
/// alts!(P1, P2, P3, P4)
/// ```
#[macro_export]
macro_rules! alts {
    ($p:expr) => {
        $p
    };
    ($p:expr , $($ts:tt)+) => {
        $crate::Parser::or($p, $crate::alts!($($ts)+))
    };
}

pub use alts;
